use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("validation_error - {0}")]
    Validation(String),
    #[error("not_found - {0}")]
    NotFound(String),
    #[error("persistence_error - {0}")]
    Persistence(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
}

impl AppError {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::NotFound(message.into())
    }

    pub fn persistence<M: Into<String>>(message: M) -> Self {
        Self::Persistence(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Persistence(_) => "persistence_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message) => message,
            Self::NotFound(message) => message,
            Self::Persistence(message) => message,
            Self::InvalidData(message) => message,
        }
    }

    /// Unknown ids are reported rather than treated as failures; the
    /// operation that produced this left every collection untouched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn display_includes_code_and_message() {
        let err = AppError::validation("text is required");
        assert_eq!(err.to_string(), "validation_error - text is required");
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::validation("x").code(), "validation_error");
        assert_eq!(AppError::not_found("x").code(), "not_found");
        assert_eq!(AppError::persistence("x").code(), "persistence_error");
        assert_eq!(AppError::invalid_data("x").code(), "invalid_data");
    }

    #[test]
    fn only_not_found_reports_not_found() {
        assert!(AppError::not_found("task-1").is_not_found());
        assert!(!AppError::validation("task-1").is_not_found());
    }
}
