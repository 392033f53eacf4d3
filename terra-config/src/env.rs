// Environment overrides

use std::collections::HashMap;
use std::env;

/// Collects `PREFIX_*` variables, keyed by the rest of the name in
/// lower case: `TERRA_MAIL__HOST` becomes `mail__host`.
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Read the process environment.
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    pub fn collect(
        &self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> HashMap<String, String> {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let rest = key.strip_prefix(&self.prefix)?.strip_prefix('_')?;
                (!rest.is_empty()).then(|| (rest.to_lowercase(), value))
            })
            .collect()
    }
}
