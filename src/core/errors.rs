use serde::ser::SerializeStruct;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("graph auth failed")]
    GraphAuth,
    #[error("graph rate limited")]
    GraphRateLimited,
    #[error("graph timeout")]
    GraphTimeout,
    #[error("graph invalid response: {0}")]
    GraphInvalidResponse(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::GraphAuth => "GRAPH_AUTH",
            Self::GraphRateLimited => "GRAPH_RATE_LIMITED",
            Self::GraphTimeout => "GRAPH_TIMEOUT",
            Self::GraphInvalidResponse(_) => "GRAPH_INVALID_RESPONSE",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Transient failures a user may simply re-trigger. Nothing in the crate
    /// retries on its own.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::GraphRateLimited | Self::GraphTimeout | Self::Network(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &value {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!(
                    "a record with the same unique key already exists ({})",
                    db_err.message()
                ));
            }
        }
        Self::Database(value.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::Database(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_and_message() {
        let err = AppError::UnsupportedFileType("report.xlsx".to_string());
        let json = serde_json::to_value(&err).expect("serialize");
        assert_eq!(json["code"], "UNSUPPORTED_FILE_TYPE");
        assert_eq!(json["message"], "unsupported file type: report.xlsx");
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(AppError::GraphRateLimited.retryable());
        assert!(AppError::Network("reset".into()).retryable());
        assert!(!AppError::GraphAuth.retryable());
        assert!(!AppError::Parse("bad".into()).retryable());
    }
}
