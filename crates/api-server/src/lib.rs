#![warn(clippy::unwrap_used)]

pub mod error;
pub mod rest;
pub mod server;

pub use error::ApiError;
pub use rest::AppState;
pub use server::ApiServer;
