// File loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Formats a settings or handlers file may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Toml => "TOML",
        }
    }

    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(FileFormat::Json),
            Some("toml") => Ok(FileFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Reads a file into a JSON tree regardless of its on-disk format.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(FileFormat::from_path(path.as_ref())?))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.parse(&content).map_err(|e| match e {
            ConfigError::Parse { format, message } => ConfigError::Parse {
                format,
                message: format!("{} ({})", message.trim_end(), path.display()),
            },
            other => other,
        })
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let parse_error = |message: String| ConfigError::Parse {
            format: self.format.name(),
            message,
        };

        match self.format {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
            FileFormat::Toml => {
                let table: toml::Table =
                    toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
                serde_json::to_value(table).map_err(|e| parse_error(e.to_string()))
            }
        }
    }
}

/// Merge `overlay` into `base`. Objects merge key by key; any other
/// overlay value replaces what is in `base`.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
