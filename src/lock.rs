//! flake.lock reading and per-source revision tokens.
//!
//! The revision of each pinned input becomes part of every cache key, so
//! `nix flake update` silently retires stale cache entries.

use crate::adapters::OVERLAY_INPUTS;
use crate::error::Result;
use crate::source::PackageSource;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Revision reported for sources with no pinned input.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Length of a short revision token (git short-hash convention).
const SHORT_REV_LEN: usize = 12;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlakeLock {
    #[serde(default)]
    pub nodes: BTreeMap<String, LockNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LockNode {
    #[serde(default)]
    pub locked: Option<LockedRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LockedRef {
    #[serde(default)]
    pub rev: Option<String>,
}

impl FlakeLock {
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Input names, excluding the synthetic `root` node.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .keys()
            .map(String::as_str)
            .filter(|name| *name != "root")
    }
}

/// Short revision token per flake input, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RevisionMap {
    revisions: HashMap<String, String>,
}

impl RevisionMap {
    /// Build from a flake.lock; a missing or malformed file yields an empty map.
    pub fn from_lock_file(path: &Path) -> Self {
        match FlakeLock::read(path) {
            Ok(lock) => Self::from_lock(&lock),
            Err(e) => {
                tracing::debug!("no revisions from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_lock(lock: &FlakeLock) -> Self {
        let revisions = lock
            .nodes
            .iter()
            .filter(|(name, _)| name.as_str() != "root")
            .filter_map(|(name, node)| {
                let rev = node.locked.as_ref()?.rev.as_deref()?;
                Some((name.clone(), short_rev(rev)))
            })
            .collect();
        Self { revisions }
    }

    /// Build from explicit `(input, revision)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let revisions = pairs
            .into_iter()
            .map(|(input, rev)| (input.into(), short_rev(rev.as_ref())))
            .collect();
        Self { revisions }
    }

    /// Revision of a flake input, or [`UNKNOWN_REVISION`].
    pub fn get(&self, input: &str) -> &str {
        self.revisions
            .get(input)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_REVISION)
    }

    /// Revision that keys cache entries for `source`.
    ///
    /// Overlay candidates may come from any known overlay input, so their
    /// token combines the revision of every one pinned in the lock.
    pub fn for_source(&self, source: PackageSource) -> Cow<'_, str> {
        if source != PackageSource::FlakeInput {
            return Cow::Borrowed(self.get(source.lock_input()));
        }
        let pinned: Vec<String> = OVERLAY_INPUTS
            .iter()
            .filter_map(|(input, _)| {
                self.revisions
                    .get(*input)
                    .map(|rev| format!("{input}@{rev}"))
            })
            .collect();
        if pinned.is_empty() {
            Cow::Borrowed(UNKNOWN_REVISION)
        } else {
            Cow::Owned(pinned.join("+"))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

fn short_rev(rev: &str) -> String {
    rev.chars().take(SHORT_REV_LEN).collect()
}
