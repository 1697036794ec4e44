//! Resolver configuration.
//!
//! Defaults mirror the interactive CLI: a 45 second search deadline shared by
//! all parallel sources, four workers, and per-call tool timeouts so an
//! abandoned query never runs unbounded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "nxresolve";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Directory holding the resolution cache file
    pub cache_dir: PathBuf,
    /// flake.lock of the consuming repository; enables overlay search and
    /// revision-keyed caching
    pub flake_lock: Option<PathBuf>,
    /// Repository scanned for already-configured packages
    pub repo_root: Option<PathBuf>,
    /// Overall deadline for the parallel search group
    pub search_deadline: Duration,
    pub max_workers: usize,
    pub nix_timeout: Duration,
    pub nur_timeout: Duration,
    pub eval_timeout: Duration,
    pub catalog_timeout: Duration,
    pub use_cache: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            flake_lock: None,
            repo_root: None,
            search_deadline: Duration::from_secs(45),
            max_workers: 4,
            nix_timeout: Duration::from_secs(30),
            nur_timeout: Duration::from_secs(60),
            eval_timeout: Duration::from_secs(15),
            catalog_timeout: Duration::from_secs(10),
            use_cache: true,
        }
    }
}

impl ResolverConfig {
    /// Defaults adjusted by `NXR_CACHE_DIR` and `NXR_SEARCH_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os("NXR_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        match std::env::var("NXR_SEARCH_TIMEOUT_SECS")
            .ok()
            .map(|v| v.parse::<u64>())
        {
            Some(Ok(secs)) if secs > 0 => config.search_deadline = Duration::from_secs(secs),
            Some(_) => tracing::warn!("ignoring invalid NXR_SEARCH_TIMEOUT_SECS"),
            None => {}
        }
        config
    }

    /// Use a repository root: its flake.lock and its `.nix` files.
    pub fn with_repo(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let lock = root.join("flake.lock");
        if lock.exists() {
            self.flake_lock = Some(lock);
        }
        self.repo_root = Some(root.to_path_buf());
        self
    }
}

/// Cache directory (~/.cache/nxresolve or equivalent).
pub fn default_cache_dir() -> PathBuf {
    if let Some(cache_home) = std::env::var_os("XDG_CACHE_HOME") {
        PathBuf::from(cache_home).join(APP_DIR)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".cache").join(APP_DIR)
    } else {
        PathBuf::from(".cache").join(APP_DIR)
    }
}
