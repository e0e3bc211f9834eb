//! Integration Registry: connected ad accounts and the live credentials
//! adapters run with.

pub mod error;
pub mod oauth;
pub mod registry;

pub use error::{RefreshError, RegistryError, RegistryResult};
pub use oauth::{GoogleTokenRefresher, TokenRefresher};
pub use registry::{IntegrationRegistry, OAuthGrant};
