//! Terra Logging
//!
//! Installs a `tracing` subscriber configured from `TERRA_*` environment
//! variables. Library crates in the workspace only emit `tracing` events;
//! binaries and tests call [`init`] once to decide where they go.
//!
//! # Usage
//!
//! ```rust
//! terra_log::init();
//! tracing::info!(action = "USER_CREATED", "dispatching");
//! ```
//!
//! # Environment Variables
//!
//! - `TERRA_DEBUG=1` - Enable debug logging
//! - `TERRA_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `TERRA_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `TERRA_LOG_COLOR=1|0` - Enable/disable colors
//!
//! `RUST_LOG` takes precedence over `TERRA_LOG_LEVEL` when it is set.

use once_cell::sync::OnceCell;
use std::env;

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum severity that reaches the output, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line, human oriented
    Pretty,
    /// Single-line
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include the event target (module path)
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Compact,
            color: false,
            target: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("TERRA_DEBUG").unwrap_or(false);

        let mut level = lookup("TERRA_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(Level::Info);
        if debug && level > Level::Debug {
            level = Level::Debug;
        }

        let format = lookup("TERRA_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Compact);

        let color = flag("TERRA_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        let target = flag("TERRA_LOG_TARGET").unwrap_or(true);

        Self {
            debug,
            level,
            format,
            color,
            target,
        }
    }

    /// Raise or lower the level, e.g. from `--verbose` / `--quiet`.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

// ============================================================================
// Subscriber Installation
// ============================================================================

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Install the global subscriber using [`LogConfig::from_env`].
pub fn init() {
    init_with(LogConfig::from_env());
}

/// Install the global subscriber with an explicit configuration.
///
/// Only the first call has an effect; the configuration that won is
/// returned by [`installed`].
pub fn init_with(config: LogConfig) {
    INSTALLED.get_or_init(|| {
        install(&config);
        config
    });
}

/// Configuration of the installed subscriber, if any.
pub fn installed() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

fn install(config: &LogConfig) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color)
        .with_target(config.target);

    // Another subscriber may already be installed (tests, embedding
    // applications); that one wins.
    let _ = match config.format {
        Format::Pretty => builder.pretty().try_init(),
        Format::Compact => builder.compact().try_init(),
        #[cfg(feature = "json")]
        Format::Json => builder.json().try_init(),
        #[cfg(not(feature = "json"))]
        Format::Json => builder.compact().try_init(),
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("invalid"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_defaults_without_env() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Compact);
        assert!(!config.debug);
        assert!(!config.color);
    }

    #[test]
    fn test_debug_forces_debug_level() {
        let config = LogConfig::from_lookup(lookup(&[
            ("TERRA_DEBUG", "true"),
            ("TERRA_LOG_LEVEL", "error"),
        ]));
        assert!(config.debug);
        assert_eq!(config.level, Level::Debug);
    }

    #[test]
    fn test_explicit_values() {
        let config = LogConfig::from_lookup(lookup(&[
            ("TERRA_LOG_LEVEL", "trace"),
            ("TERRA_LOG_FORMAT", "json"),
            ("TERRA_LOG_COLOR", "1"),
            ("TERRA_LOG_TARGET", "0"),
        ]));
        assert_eq!(config.level, Level::Trace);
        assert_eq!(config.format, Format::Json);
        assert!(config.color);
        assert!(!config.target);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_with(LogConfig::default().with_level(Level::Warn));
        init_with(LogConfig::default().with_level(Level::Trace));
        assert_eq!(installed().map(|c| c.level), Some(Level::Warn));
        tracing::warn!("still works");
    }
}
