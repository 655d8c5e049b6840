//! Engine configuration, loadable from RON.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Retry schedule for snapshot refreshes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshPolicy {
    /// Total read attempts per refresh, at least one.
    pub attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay.
    pub max_backoff_ms: u64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
        }
    }
}

impl RefreshPolicy {
    /// A policy that tries exactly once.
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay to wait after failed attempt number `failed` (1-based).
    pub fn backoff(&self, failed: u32) -> Duration {
        let shift = failed.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Configuration for a [`crate::ReconciliationEngine`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineCfg {
    /// Refresh retry schedule.
    pub refresh: RefreshPolicy,
    /// Buffered events per subscriber before the slowest one starts lagging.
    pub event_capacity: usize,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            refresh: RefreshPolicy::default(),
            event_capacity: 256,
        }
    }
}

impl EngineCfg {
    /// Parse and validate a RON document. Missing fields take defaults.
    pub fn from_ron(text: &str) -> Result<Self> {
        let cfg: Self = ron::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a RON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_ron(&text)
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.refresh.attempts == 0 {
            return Err(Error::Config("refresh.attempts must be at least 1".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
