//! Error types for tasstooter

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TootError>;

#[derive(Error, Debug)]
pub enum TootError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl TootError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TootError::InvalidInput(_) => 3,
            TootError::Platform(PlatformError::Authentication(_)) => 2,
            TootError::Platform(_) => 1,
            TootError::Config(_) => 1,
            TootError::Storage(_) => 1,
            TootError::Ledger(_) => 1,
            TootError::Signal(_) => 1,
        }
    }

    /// Whether this error came from the record store.
    ///
    /// The reply listener treats storage failures as fatal and everything
    /// else as a per-notification problem.
    pub fn is_storage(&self) -> bool {
        matches!(self, TootError::Storage(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(std::path::PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed record {collection}/{key}: {source}")]
    Malformed {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Post {0} is already recorded in the ledger")]
    AlreadyRecorded(String),

    #[error("Post {0} is unknown to the ledger")]
    UnknownId(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = TootError::InvalidInput("Empty toot".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_missing_config_and_signal_setup() {
        let missing: TootError =
            ConfigError::NotFound(std::path::PathBuf::from("/nope/config.toml")).into();
        assert_eq!(missing.exit_code(), 1);
        assert_eq!(
            missing.to_string(),
            "Configuration error: Config file not found: /nope/config.toml"
        );

        let signal = TootError::Signal(std::io::Error::other("no signal driver"));
        assert_eq!(signal.exit_code(), 1);
        assert!(!signal.is_storage());
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = TootError::Platform(PlatformError::Authentication("bad token".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let posting = TootError::Platform(PlatformError::Posting("timeout".to_string()));
        assert_eq!(posting.exit_code(), 1);

        let storage = TootError::Storage(StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        )));
        assert_eq!(storage.exit_code(), 1);

        let ledger = TootError::Ledger(LedgerError::UnknownId("42".to_string()));
        assert_eq!(ledger.exit_code(), 1);

        let config = TootError::Config(ConfigError::MissingField("database.path".to_string()));
        assert_eq!(config.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting() {
        let error = TootError::Ledger(LedgerError::AlreadyRecorded("109".to_string()));
        assert_eq!(
            error.to_string(),
            "Ledger error: Post 109 is already recorded in the ledger"
        );

        let error = TootError::Platform(PlatformError::Network("refused".to_string()));
        assert_eq!(error.to_string(), "Platform error: Network error: refused");
    }

    #[test]
    fn test_is_storage() {
        let storage: TootError = StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ))
        .into();
        assert!(storage.is_storage());

        let platform: TootError = PlatformError::Posting("nope".to_string()).into();
        assert!(!platform.is_storage());
    }
}
