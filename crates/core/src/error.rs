use thiserror::Error;

/// A profile field that failed validation before scoring started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`crate::service::RecommendationService`].
///
/// A collaborator failure is always reported as `UpstreamUnavailable`; it is never turned into an
/// empty run or an empty report.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid profile: {0}")]
    Validation(#[from] ValidationError),

    #[error("upstream unavailable: {0:#}")]
    UpstreamUnavailable(#[source] anyhow::Error),
}

impl ServiceError {
    pub fn upstream(err: anyhow::Error) -> Self {
        Self::UpstreamUnavailable(err)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
