// Configuration errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("Invalid setting {key}: {message}")]
    Invalid { key: String, message: String },

    /// The merged tree does not deserialize into the settings type
    #[error("Settings do not have the expected shape: {0}")]
    Shape(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
