//! `[preload]` section configuration.
//!
//! ```toml
//! [preload]
//! critical = ["/images/avatar.jpg"]   # Priority images (preload + fetchpriority=high)
//! priority_batch = 6                  # Concurrent priority loads
//! idle_batch = 3                      # Concurrent deferred loads
//! batch_delay = 100                   # ms between deferred batches
//! idle_timeout = 2000                 # ms to wait for the idle signal
//! fallback_delay = 100                # ms to wait when there is no idle signal
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::preload::PreloadOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    pub critical: Vec<String>,
    pub priority_batch: usize,
    pub idle_batch: usize,
    pub batch_delay: u64,
    pub idle_timeout: u64,
    pub fallback_delay: u64,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        let defaults = PreloadOptions::default();
        Self {
            critical: Vec::new(),
            priority_batch: defaults.priority_batch,
            idle_batch: defaults.idle_batch,
            batch_delay: millis(defaults.batch_delay),
            idle_timeout: millis(defaults.idle_timeout),
            fallback_delay: millis(defaults.fallback_delay),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl PreloadConfig {
    pub const CRITICAL: FieldPath = FieldPath::new("preload.critical");
    pub const PRIORITY_BATCH: FieldPath = FieldPath::new("preload.priority_batch");
    pub const IDLE_BATCH: FieldPath = FieldPath::new("preload.idle_batch");

    pub fn options(&self, site: Option<Url>) -> PreloadOptions {
        PreloadOptions {
            priority_batch: self.priority_batch,
            idle_batch: self.idle_batch,
            batch_delay: Duration::from_millis(self.batch_delay),
            idle_timeout: Duration::from_millis(self.idle_timeout),
            fallback_delay: Duration::from_millis(self.fallback_delay),
            site,
        }
    }

    /// Whether `src` is listed as critical.
    pub fn is_critical(&self, src: &str) -> bool {
        self.critical.iter().any(|c| c == src)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.priority_batch == 0 {
            diag.error(Self::PRIORITY_BATCH, "must be at least 1");
        }
        if self.idle_batch == 0 {
            diag.error(Self::IDLE_BATCH, "must be at least 1");
        }
        for src in &self.critical {
            if src.is_empty() {
                diag.error(Self::CRITICAL, "empty image path");
            } else if !src.starts_with('/') && !crate::utils::path::is_external_link(src) {
                diag.warn(
                    Self::CRITICAL,
                    format!("`{src}` is relative; critical images are matched by exact `src`"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_preload_defaults() {
        let options = test_parse_config("").preload.options(None);
        assert_eq!(options.priority_batch, 6);
        assert_eq!(options.idle_batch, 3);
        assert_eq!(options.batch_delay, Duration::from_millis(100));
        assert_eq!(options.idle_timeout, Duration::from_millis(2000));
        assert_eq!(options.fallback_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_preload_overrides() {
        let config = test_parse_config(
            "[preload]\ncritical = [\"/images/avatar.jpg\"]\nidle_batch = 2\nbatch_delay = 50",
        );
        assert!(config.preload.is_critical("/images/avatar.jpg"));
        let options = config.preload.options(None);
        assert_eq!(options.idle_batch, 2);
        assert_eq!(options.batch_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_preload_validation() {
        let config = test_parse_config(
            "[preload]\npriority_batch = 0\ncritical = [\"\", \"images/a.jpg\"]",
        );
        let mut diag = ConfigDiagnostics::new();
        config.preload.validate(&mut diag);
        assert_eq!(diag.len(), 2);
        assert_eq!(diag.warnings().len(), 1);
    }
}
