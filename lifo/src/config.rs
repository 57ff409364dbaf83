// /////////////////////////////////////////////////////////////////////////////
// Lifo
// SPDX-License-Identifier: MIT
// /////////////////////////////////////////////////////////////////////////////

//! Runtime configuration (SPEC_FULL.md §B "Configuration").
//!
//! `LifoConfig` collects the constants spec.md §4.A/§6 otherwise hard-codes
//! (content-store budget, chunk geometry, persistence debounce, default
//! environment) into one value loadable from a TOML file with environment
//! overrides, the way the teacher's `infrastructure::config` loads its
//! pipeline configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lifo_domain::{
    CHUNK_SIZE, CHUNK_THRESHOLD, DEFAULT_CONTENT_STORE_BUDGET, PERSISTENCE_DEBOUNCE_MS,
};

/// Top-level runtime configuration for one Lifo instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifoConfig {
    pub content_store_max_bytes: u64,
    pub chunk_threshold: u64,
    pub chunk_size: u64,
    pub persistence_debounce_ms: u64,
    /// Directory the `SqliteBlobStore` / `NativeFsProvider` defaults live
    /// under when the embedder doesn't supply its own paths.
    pub data_dir: String,
    pub default_env: HashMap<String, String>,
}

impl Default for LifoConfig {
    fn default() -> Self {
        let mut default_env = HashMap::new();
        default_env.insert("HOME".to_string(), "/home/user".to_string());
        default_env.insert("USER".to_string(), "user".to_string());
        default_env.insert("SHELL".to_string(), "/bin/sh".to_string());
        default_env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        default_env.insert("TERM".to_string(), "xterm-256color".to_string());
        default_env.insert("PWD".to_string(), "/home/user".to_string());
        default_env.insert("HOSTNAME".to_string(), "lifo".to_string());

        Self {
            content_store_max_bytes: DEFAULT_CONTENT_STORE_BUDGET,
            chunk_threshold: CHUNK_THRESHOLD,
            chunk_size: CHUNK_SIZE,
            persistence_debounce_ms: PERSISTENCE_DEBOUNCE_MS,
            data_dir: "./lifo-data".to_string(),
            default_env,
        }
    }
}

impl LifoConfig {
    /// The VFS path for the starting user's home directory, taken from
    /// `default_env`'s `HOME` (falling back to `/home/user` if absent). This
    /// is a VFS path, distinct from `data_dir`, which names a *host*
    /// directory for the on-disk persistence backends.
    pub fn data_dir_home(&self) -> String {
        self.default_env
            .get("HOME")
            .cloned()
            .unwrap_or_else(|| "/home/user".to_string())
    }

    /// Load configuration from (in ascending priority) built-in defaults, an
    /// optional TOML file, and `LIFO_*`-prefixed environment variables,
    /// mirroring the teacher's layered `config::Config` builder.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);
        if let Some(path) = file {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            }
        }
        builder = builder.add_source(config::Environment::with_prefix("LIFO").separator("__"));
        let settled = builder.build()?;
        Ok(settled.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = LifoConfig::default();
        assert_eq!(cfg.chunk_threshold, CHUNK_THRESHOLD);
        assert_eq!(cfg.chunk_size, CHUNK_SIZE);
        assert_eq!(cfg.content_store_max_bytes, DEFAULT_CONTENT_STORE_BUDGET);
        assert_eq!(cfg.default_env.get("HOME").map(String::as_str), Some("/home/user"));
    }

    #[test]
    fn loads_without_a_file() {
        let cfg = LifoConfig::load(None).unwrap();
        assert_eq!(cfg.persistence_debounce_ms, PERSISTENCE_DEBOUNCE_MS);
    }
}
