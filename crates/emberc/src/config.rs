//! Driver configuration, loadable from an optional `.emberc.toml` file,
//! using a builder pattern (`with_*` methods, `Default`).
//!
//! Absent a config file, built-in defaults apply: a 256-slot stack and a
//! 256-constant cap, matching [`ember_vm::STACK_CAPACITY`] and
//! [`ember_core::MAX_CONSTANTS`].

use ember_core::MAX_CONSTANTS;
use ember_vm::STACK_CAPACITY;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Driver-level knobs that do not change EmberScript's language semantics
/// - only how much room the compiler/VM give a program before failing.
/// `stack_capacity` governs [`ember_vm::execute_with_stack_capacity`];
/// `max_constants` governs [`ember_compiler::compile_source_with_limits`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub stack_capacity: usize,
    pub max_constants: usize,
    pub verbose: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            stack_capacity: STACK_CAPACITY,
            max_constants: MAX_CONSTANTS,
            verbose: false,
        }
    }
}

impl DriverConfig {
    /// Loads `.emberc.toml` from `dir` if present; returns built-in
    /// defaults otherwise. A malformed config file is a hard error - the
    /// driver would rather fail loudly than silently run with the wrong
    /// limits.
    pub fn load_from_dir(dir: &Path) -> Result<DriverConfig, ConfigError> {
        let path = dir.join(".emberc.toml");
        if !path.exists() {
            return Ok(DriverConfig::default());
        }
        let text = fs::read_to_string(&path).map_err(ConfigError::Io)?;
        toml::from_str(&text).map_err(ConfigError::Toml)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read .emberc.toml: {e}"),
            ConfigError::Toml(e) => write!(f, "malformed .emberc.toml: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_built_in_limits() {
        let config = DriverConfig::default();
        assert_eq!(config.stack_capacity, STACK_CAPACITY);
        assert_eq!(config.max_constants, MAX_CONSTANTS);
        assert!(!config.verbose);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DriverConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.stack_capacity, STACK_CAPACITY);
    }

    #[test]
    fn loads_overrides_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".emberc.toml"), "stack_capacity = 512\nverbose = true\n").unwrap();
        let config = DriverConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.stack_capacity, 512);
        assert!(config.verbose);
        assert_eq!(config.max_constants, MAX_CONSTANTS);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".emberc.toml"), "stack_capacity = \"not a number\"\n").unwrap();
        assert!(DriverConfig::load_from_dir(dir.path()).is_err());
    }
}
