//! Campaign Fan-out Orchestrator: turns one create-ad request into a
//! campaign → ad group → ad chain on every requested platform.

pub mod error;
pub mod orchestrator;
pub mod request;
pub mod retry;

pub use error::{FanoutError, FanoutResult};
pub use orchestrator::{FanoutOrchestrator, FanoutReport};
pub use request::{BudgetRequest, CreateAdRequest, CreativeRequest, FileUpload, TargetingRequest, ValidatedRequest};
pub use retry::RetryPolicy;
