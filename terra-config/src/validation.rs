// Settings validation

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Checked after settings are assembled from every source.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(key, "must not be empty"));
    }
    Ok(())
}

pub fn within<T: PartialOrd + Display>(key: &str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        return Err(ConfigError::invalid(
            key,
            format!("{} is outside {}..={}", value, min, max),
        ));
    }
    Ok(())
}

/// Accepts `addr@host.tld` or `Name <addr@host.tld>`.
pub fn mailbox(key: &str, value: &str) -> Result<()> {
    let addr = match value.split_once('<') {
        Some((_, rest)) => rest.strip_suffix('>').unwrap_or(rest),
        None => value,
    };
    let ok = addr
        .trim()
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.contains('@') && domain.contains('.')
        });

    if !ok {
        return Err(ConfigError::invalid(key, format!("'{}' is not an email address", value)));
    }
    Ok(())
}
