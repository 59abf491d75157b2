use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),

    #[error("Mapping rule {id} not found for transaction '{transaction}'")]
    RuleNotFound { transaction: String, id: u64 },

    #[error("Invalid path expression '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Upstream returned status {status}: {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// 單一映射規則內的錯誤，不會中斷整個轉換
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("cannot descend into '{segment}' of '{path}': existing value is not a map")]
    PathConflict { path: String, segment: String },

    #[error("unparsable date: '{input}'")]
    InvalidDate { input: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// CLI 退出碼；指令失敗時一律非零
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low | ErrorSeverity::High => 1, // 輸入或處理錯誤
            ErrorSeverity::Medium => 2,                   // 可重試
            ErrorSeverity::Critical => 3,                 // 系統錯誤
        }
    }
}

impl BridgeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::ConfigValidationError { .. }
            | BridgeError::InvalidConfigValueError { .. }
            | BridgeError::MissingConfigError { .. }
            | BridgeError::UnknownTransactionType(_)
            | BridgeError::RuleNotFound { .. }
            | BridgeError::InvalidPath { .. }
            | BridgeError::TomlError(_) => ErrorCategory::Configuration,
            BridgeError::ApiError(_) | BridgeError::UpstreamError { .. } => ErrorCategory::Network,
            BridgeError::SerializationError(_) | BridgeError::ValidationError { .. } => {
                ErrorCategory::Data
            }
            BridgeError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BridgeError::ValidationError { .. } => ErrorSeverity::Low,
            BridgeError::ApiError(_) | BridgeError::UpstreamError { .. } => ErrorSeverity::Medium,
            BridgeError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the configuration file and the transaction type in the request path".to_string()
            }
            ErrorCategory::Network => {
                "Verify the upstream endpoint is reachable and the credentials are valid".to_string()
            }
            ErrorCategory::Data => "Inspect the input document for malformed content".to_string(),
            ErrorCategory::System => "Check file permissions and available disk space".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BridgeError::UnknownTransactionType(tx) => {
                format!("Transaction type '{}' is not configured", tx)
            }
            BridgeError::UpstreamError { status, .. } => {
                format!("The partner API rejected the request (HTTP {})", status)
            }
            BridgeError::ApiError(_) => "Could not reach the partner API".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_transaction_is_configuration_error() {
        let err = BridgeError::UnknownTransactionType("refund".to_string());
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("refund"));
    }

    #[test]
    fn test_upstream_error_is_retryable() {
        let err = BridgeError::UpstreamError {
            status: 503,
            message: "busy".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_failed_commands_never_exit_zero() {
        let invalid_example = BridgeError::ValidationError {
            message: "example response is not valid JSON".to_string(),
        };
        assert_eq!(invalid_example.severity(), ErrorSeverity::Low);
        assert_eq!(invalid_example.severity().exit_code(), 1);

        for severity in [
            ErrorSeverity::Low,
            ErrorSeverity::Medium,
            ErrorSeverity::High,
            ErrorSeverity::Critical,
        ] {
            assert_ne!(severity.exit_code(), 0);
        }
    }
}
