//! Worker configuration.
//!
//! The version tag, core asset list and offline fallback URL are injected
//! at worker construction rather than hardcoded, so deployments bump the
//! tag in one place and tests can parameterize it.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Page served when a navigation fails at the network and has no cached
/// equivalent. Must appear in the core asset list to be available.
pub const DEFAULT_OFFLINE_FALLBACK: &str = "/static/offline.html";

fn default_offline_fallback() -> String {
    DEFAULT_OFFLINE_FALLBACK.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Current version tag; names the one partition that is "current".
    pub cache_name: String,

    /// URLs that must be available offline after a successful install.
    pub core_assets: Vec<String>,

    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Bounded wait for network attempts during fetch interception.
    /// None leaves a hanging fetch to the transport's own timeout.
    #[serde(default)]
    pub network_timeout_secs: Option<u64>,
}

impl WorkerConfig {
    pub fn new(cache_name: impl Into<String>, core_assets: Vec<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            core_assets,
            offline_fallback: default_offline_fallback(),
            network_timeout_secs: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.network_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(
            "offline-cache-v1",
            vec![
                "/".to_string(),
                "/static/index.html".to_string(),
                "/static/offline.html".to_string(),
                "/static/icons/icon-192x192.png".to_string(),
                "/static/icons/icon-512x512.png".to_string(),
                "/static/manifest.json".to_string(),
            ],
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_includes_offline_fallback_in_core_assets() {
        let config = WorkerConfig::default();
        assert!(config
            .core_assets
            .contains(&config.offline_fallback));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.json");

        let mut config = WorkerConfig::new("offline-cache-v2", vec!["/".to_string()]);
        config.network_timeout_secs = Some(5);
        config.save(&path).unwrap();

        let loaded = WorkerConfig::load(&path).unwrap();
        assert_eq!(loaded.cache_name, "offline-cache-v2");
        assert_eq!(loaded.network_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(loaded.offline_fallback, DEFAULT_OFFLINE_FALLBACK);
    }

    #[test]
    fn test_missing_optional_fields_take_defaults() {
        let parsed: WorkerConfig = serde_json::from_str(
            r#"{"cache_name": "offline-cache-v3", "core_assets": ["/"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.offline_fallback, DEFAULT_OFFLINE_FALLBACK);
        assert_eq!(parsed.network_timeout(), None);
    }
}
