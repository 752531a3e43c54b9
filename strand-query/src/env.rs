//! Environment variable sources for configuration loading.
//!
//! Backends read their settings through an [`EnvSource`] so configuration
//! code can be exercised with a [`MapEnvSource`] instead of the process
//! environment.

use std::collections::HashMap;

/// Source for environment variables.
pub trait EnvSource: Send + Sync {
    /// Get an environment variable value.
    fn get(&self, name: &str) -> Option<String>;

    /// Check if a variable exists.
    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get a variable parsed as a boolean flag.
    ///
    /// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`
    /// (case-insensitive). Anything else reads as `None`.
    fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)
            .and_then(|v| match v.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            })
    }
}

/// Default environment source using std::env.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Environment source backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapEnvSource {
    vars: HashMap<String, String>,
}

impl MapEnvSource {
    /// Create a new map-based environment source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Add multiple variables.
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_source() {
        let source = MapEnvSource::new().set("STRAND_MONGODB_DATABASE", "app");
        assert_eq!(source.get("STRAND_MONGODB_DATABASE"), Some("app".to_string()));
        assert!(!source.contains("MISSING"));
    }

    #[test]
    fn test_get_bool() {
        let source = MapEnvSource::new()
            .set("A", "TRUE")
            .set("B", "off")
            .set("C", "maybe");

        assert_eq!(source.get_bool("A"), Some(true));
        assert_eq!(source.get_bool("B"), Some(false));
        assert_eq!(source.get_bool("C"), None);
        assert_eq!(source.get_bool("D"), None);
    }

    #[test]
    fn test_with_vars() {
        let mut vars = HashMap::new();
        vars.insert("X".to_string(), "1".to_string());
        let source = MapEnvSource::new().with_vars(vars);
        assert!(source.contains("X"));
    }
}
