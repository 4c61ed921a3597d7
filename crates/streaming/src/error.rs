use data_validator::{ConfigError, ValidationError};
use pipeline::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),
    #[error("Stream already running for user {0}")]
    AlreadyRunning(String),
    #[error("No active stream for user {0}")]
    NotFound(String),
    #[error("Session task failed: {0}")]
    TaskFailed(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Buffer(#[from] ValidationError),
}

impl StreamError {
    /// Pipeline error class, for the variants that have one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StreamError::ConnectionFailure(_) => Some(ErrorKind::Connection),
            StreamError::Config(_) => Some(ErrorKind::Config),
            StreamError::Buffer(_) => Some(ErrorKind::Validation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            StreamError::ConnectionFailure("refused".into()).kind(),
            Some(ErrorKind::Connection)
        );
        assert_eq!(
            StreamError::from(ConfigError::ZeroWindowSize).kind(),
            Some(ErrorKind::Config)
        );
        assert_eq!(StreamError::NotFound("u".into()).kind(), None);
    }
}
