//! Error types for Dockhand

/// Dockhand error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Log file not found: {0}")]
    LogFileNotFound(String),

    #[error("Invalid log file name: {0}")]
    InvalidLogFile(String),

    #[error("Unparseable timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Line count must be positive, got {0}")]
    InvalidLineCount(i64),

    #[error("Unknown power action: {0}")]
    UnknownPowerAction(String),

    #[error("Action already in flight for service: {0}")]
    ActionInFlight(String),

    #[error("Result slice of {bytes} bytes exceeds the {cap} byte cap; narrow the time range")]
    RangeTooLarge { bytes: u64, cap: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error on {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for Dockhand
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    pub fn command<S: Into<String>>(msg: S) -> Self {
        Error::CommandFailed(msg.into())
    }

    /// Wrap an IO error with the service-relative path it occurred on.
    ///
    /// Absolute host paths never leave the engine; callers see
    /// `<service>/logs/<file>` instead.
    pub fn file_io(rel_path: impl Into<String>, source: std::io::Error) -> Self {
        let path = rel_path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::LogFileNotFound(path)
        } else {
            Error::FileIo { path, source }
        }
    }

    /// Whether this error is a caller mistake rather than an engine failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::ServiceNotFound(_)
                | Error::LogFileNotFound(_)
                | Error::InvalidLogFile(_)
                | Error::InvalidTimestamp(_)
                | Error::InvalidLineCount(_)
                | Error::UnknownPowerAction(_)
                | Error::ActionInFlight(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ServiceNotFound("webapp".to_string());
        assert_eq!(err.to_string(), "Service not found: webapp");
    }

    #[test]
    fn test_file_io_not_found_redacts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::file_io("webapp/logs/app.log", io_err);
        assert!(matches!(err, Error::LogFileNotFound(_)));
        assert_eq!(err.to_string(), "Log file not found: webapp/logs/app.log");
    }

    #[test]
    fn test_file_io_other_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::file_io("webapp/logs/app.log", io_err);
        assert!(matches!(err, Error::FileIo { .. }));
        assert!(err.to_string().contains("webapp/logs/app.log"));
    }

    #[test]
    fn test_validation_split() {
        assert!(Error::ServiceNotFound("x".into()).is_validation());
        assert!(Error::InvalidLineCount(0).is_validation());
        assert!(!Error::RangeTooLarge { bytes: 1, cap: 0 }.is_validation());
        assert!(!Error::CommandFailed("x".into()).is_validation());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
    }
}
