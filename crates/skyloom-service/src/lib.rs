//! Weather service layer
//!
//! Owns the provider tiers, the location catalog and the reducer, and exposes
//! the operations served over HTTP.

pub mod catalog;
pub mod orchestrator;

pub use catalog::*;
pub use orchestrator::*;

use skyloom_core::DateError;
use skyloom_providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Provider failure: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<DateError> for ServiceError {
    fn from(e: DateError) -> Self {
        ServiceError::Validation(e.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
