//! Monitor configuration
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! { "max_sampled_threads": 8, "os_functions": ["my_wait_loop", "spin_*"] }
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::domain::ConfigError;
use crate::profiling::{DEFAULT_STACK_DEPTH, MAX_MODULES_PER_SAMPLE};

use super::ordering::SortKey;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Threads kept per rebuild; the rest are neither shown nor sampled.
    pub max_displayed_threads: usize,
    /// Threads stack-sampled per pass, counted from the top of the collection.
    pub max_sampled_threads: usize,
    /// Pause between the two CPU readings of a rebuild sorted by CPU usage.
    pub settle_delay_ms: u64,
    /// Period at which the driver calls `tick()`.
    pub tick_interval_ms: u64,
    /// Frame budget per stack sample.
    pub stack_depth: usize,
    /// Distinct module names kept per sample.
    pub max_modules: usize,
    /// Initial sort key.
    pub sort: SortKey,
    /// Extra runtime/OS module entries (`name` or `prefix*`).
    pub os_modules: Vec<String>,
    /// Extra OS function entries (`name` or `prefix*`).
    pub os_functions: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_displayed_threads: 256,
            max_sampled_threads: 32,
            settle_delay_ms: 100,
            tick_interval_ms: 1000,
            stack_depth: DEFAULT_STACK_DEPTH,
            max_modules: MAX_MODULES_PER_SAMPLE,
            sort: SortKey::CpuUsage,
            os_modules: Vec::new(),
            os_functions: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Load a JSON config file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON for this
    /// struct, or fails [`MonitorConfig::validate`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] for zero intervals or budgets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".to_string()));
        }
        if self.stack_depth == 0 {
            return Err(ConfigError::Invalid("stack_depth must be positive".to_string()));
        }
        if self.max_modules == 0 {
            return Err(ConfigError::Invalid("max_modules must be positive".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_modules, 10);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_sampled_threads": 4, "sort": "thread_id", "os_functions": ["spin_*"] }}"#)
            .unwrap();

        let config = MonitorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_sampled_threads, 4);
        assert_eq!(config.sort, SortKey::ThreadId);
        assert_eq!(config.os_functions, vec!["spin_*".to_string()]);
        assert_eq!(config.max_displayed_threads, 256);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_threads": 4 }}"#).unwrap();
        assert!(matches!(MonitorConfig::from_file(file.path()), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = MonitorConfig { tick_interval_ms: 0, ..MonitorConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = MonitorConfig::from_file("/nonexistent/threadwatch.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
