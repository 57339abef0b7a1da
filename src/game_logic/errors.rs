use thiserror::Error;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum RampartError {
    // Config-related errors
    #[error("Failed to get config directory")]
    ConfigDirNotFound,

    #[error("Failed to access config or scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize config: {0}")]
    SerializationFailed(#[from] toml::ser::Error),

    #[error("Failed to deserialize config: {0}")]
    DeserializationFailed(#[from] toml::de::Error),

    #[error("Config file not found at path: {path}")]
    ConfigFileNotFound { path: PathBuf },

    // Battlefield-related errors
    #[error("Invalid obstacle grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("Scenario validation failed: {reason}")]
    InvalidScenario { reason: String },
}

/// Result type alias for all fallible setup operations
pub type RampartResult<T> = Result<T, RampartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rampart_error_display() {
        let err = RampartError::InvalidGrid {
            reason: "width must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("Invalid obstacle grid"));

        let err = RampartError::ConfigDirNotFound;
        assert_eq!(err.to_string(), "Failed to get config directory");
    }

    #[test]
    fn test_toml_error_converts() {
        let parse_error = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let err: RampartError = parse_error.into();
        assert!(matches!(err, RampartError::DeserializationFailed(_)));
    }
}
