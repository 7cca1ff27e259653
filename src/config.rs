//! Runtime configuration.
//!
//! A plain struct held per thread, the same way the render mode and terminal
//! size are held: set it once at startup with [`configure`], read it anywhere
//! with [`config`].

use std::cell::RefCell;

/// Environment variable overriding [`RuntimeConfig::max_flush_passes`].
pub const ENV_MAX_FLUSH_PASSES: &str = "SPARK_DOM_MAX_FLUSH_PASSES";

/// Environment variable overriding [`RuntimeConfig::warn_on_duplicate_keys`].
pub const ENV_WARN_DUPLICATE_KEYS: &str = "SPARK_DOM_WARN_DUPLICATE_KEYS";

/// Tunables for the scheduler and the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on drain passes in one flush.
    ///
    /// `None` drains until nothing is pending. A compute function that writes
    /// into one of its own sources never settles; with a cap the flush stops,
    /// logs an error, and leaves the remaining work pending.
    pub max_flush_passes: Option<usize>,

    /// Log a warning when a reconciliation pass sees the same key twice.
    pub warn_on_duplicate_keys: bool,

    /// Contain panics raised by subscribers and recompute jobs.
    pub catch_panics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_flush_passes: None,
            warn_on_duplicate_keys: true,
            catch_panics: true,
        }
    }
}

impl RuntimeConfig {
    /// Defaults, overridden by `SPARK_DOM_*` environment variables when set.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_FLUSH_PASSES) {
            match raw.trim() {
                "" | "none" | "0" => config.max_flush_passes = None,
                value => {
                    if let Ok(passes) = value.parse::<usize>() {
                        config.max_flush_passes = Some(passes);
                    }
                }
            }
        }

        if let Some(raw) = lookup(ENV_WARN_DUPLICATE_KEYS) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.warn_on_duplicate_keys = true,
                "0" | "false" | "no" | "off" => config.warn_on_duplicate_keys = false,
                _ => {}
            }
        }

        config
    }
}

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Install `config` for the current thread.
pub fn configure(config: RuntimeConfig) {
    CONFIG.with(|current| *current.borrow_mut() = config);
}

/// Current thread's configuration.
pub fn config() -> RuntimeConfig {
    CONFIG.with(|current| current.borrow().clone())
}

/// Restore the default configuration (for testing).
pub fn reset_config() {
    configure(RuntimeConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_flush_passes, None);
        assert!(config.warn_on_duplicate_keys);
        assert!(config.catch_panics);
    }

    #[test]
    fn test_env_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (ENV_MAX_FLUSH_PASSES, "64"),
            (ENV_WARN_DUPLICATE_KEYS, "off"),
        ]));
        assert_eq!(config.max_flush_passes, Some(64));
        assert!(!config.warn_on_duplicate_keys);
    }

    #[test]
    fn test_env_garbage_is_ignored() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (ENV_MAX_FLUSH_PASSES, "lots"),
            (ENV_WARN_DUPLICATE_KEYS, "maybe"),
        ]));
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_configure_is_thread_local() {
        configure(RuntimeConfig {
            max_flush_passes: Some(3),
            ..Default::default()
        });
        assert_eq!(config().max_flush_passes, Some(3));

        let other = std::thread::spawn(|| config().max_flush_passes)
            .join()
            .unwrap();
        assert_eq!(other, None);

        reset_config();
        assert_eq!(config(), RuntimeConfig::default());
    }
}
