//! On-disk cache of resolved candidates, keyed by source revision.
//!
//! Keys are `<normalized name>|<source>|<revision>`. The revision comes from
//! the consuming repository's flake.lock, so updating an input makes older
//! entries unreachable without any explicit purge. Entries never expire by
//! time.
//!
//! The whole document is rewritten on every mutation. Concurrent processes
//! are not coordinated: the last writer wins.

use crate::error::Result;
use crate::lock::RevisionMap;
use crate::source::{Candidate, PackageSource, normalize_name};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CACHE_FILE: &str = "packages_v4.json";
pub const CACHE_SCHEMA_VERSION: u64 = 1;

/// Sources `get_all` reads, highest priority first.
const LOOKUP_ORDER: [PackageSource; 5] = [
    PackageSource::FlakeInput,
    PackageSource::Nixpkgs,
    PackageSource::Nur,
    PackageSource::Homebrew,
    PackageSource::Cask,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheEntry {
    attr: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    requires_flake_input: bool,
    #[serde(default)]
    flake_url: Option<String>,
}

impl CacheEntry {
    fn into_candidate(self, name: &str, source: PackageSource) -> Candidate {
        Candidate {
            name: name.to_string(),
            source,
            attr: Some(self.attr),
            version: self.version,
            confidence: self.confidence,
            description: self.description,
            requires_flake_input: self.requires_flake_input,
            flake_url: self.flake_url,
        }
    }
}

#[derive(Serialize)]
struct CacheDocument<'a> {
    schema_version: u64,
    entries: &'a BTreeMap<String, CacheEntry>,
}

pub struct ResolutionCache {
    path: PathBuf,
    revisions: RevisionMap,
    entries: BTreeMap<String, CacheEntry>,
}

impl ResolutionCache {
    /// Load `<cache_dir>/packages_v4.json`.
    ///
    /// An unreadable file, invalid JSON, or a schema mismatch all start cold.
    pub fn open(cache_dir: &Path, revisions: RevisionMap) -> Self {
        let path = cache_dir.join(CACHE_FILE);
        let entries = load_entries(&path);
        Self {
            path,
            revisions,
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Revision currently keying `source`.
    pub fn revision(&self, source: PackageSource) -> Cow<'_, str> {
        self.revisions.for_source(source)
    }

    fn key(&self, name: &str, source: PackageSource) -> String {
        format!(
            "{}|{}|{}",
            normalize_name(name),
            source.as_str(),
            self.revision(source)
        )
    }

    /// Cached candidate for `name` under the current revision of `source`.
    pub fn get(&self, name: &str, source: PackageSource) -> Option<Candidate> {
        self.entries
            .get(&self.key(name, source))
            .cloned()
            .map(|entry| entry.into_candidate(name, source))
    }

    /// All cached candidates for `name`, in priority order.
    ///
    /// Answers nothing when only catalog sources are cached, so a stale
    /// fallback hit never hides a package that may now exist in nixpkgs.
    pub fn get_all(&self, name: &str) -> Vec<Candidate> {
        let results: Vec<Candidate> = LOOKUP_ORDER
            .iter()
            .filter_map(|source| self.get(name, *source))
            .collect();

        if results.iter().all(|c| c.source.is_catalog()) {
            return Vec::new();
        }
        results
    }

    fn insert(&mut self, candidate: &Candidate) -> bool {
        let Some(attr) = candidate.attr.as_deref().filter(|a| !a.is_empty()) else {
            return false;
        };
        if !candidate.source.is_cacheable() {
            return false;
        }
        let key = self.key(&candidate.name, candidate.source);
        self.entries.insert(
            key,
            CacheEntry {
                attr: attr.to_string(),
                version: candidate.version.clone(),
                description: candidate.description.clone(),
                confidence: candidate.confidence,
                requires_flake_input: candidate.requires_flake_input,
                flake_url: candidate.flake_url.clone(),
            },
        );
        true
    }

    /// Store one candidate; candidates without an attribute are ignored.
    pub fn set(&mut self, candidate: &Candidate) -> Result<()> {
        if self.insert(candidate) {
            self.save()?;
        }
        Ok(())
    }

    /// Store the best candidate per `(name, source)` with one write.
    pub fn set_many(&mut self, candidates: &[Candidate]) -> Result<()> {
        let mut best: BTreeMap<(String, PackageSource), &Candidate> = BTreeMap::new();
        for candidate in candidates {
            let slot = best
                .entry((normalize_name(&candidate.name), candidate.source))
                .or_insert(candidate);
            if candidate.confidence > slot.confidence {
                *slot = candidate;
            }
        }

        let mut changed = false;
        for candidate in best.into_values() {
            changed |= self.insert(candidate);
        }
        if changed {
            self.save()?;
        }
        Ok(())
    }

    /// Drop entries for `name` (any revision), optionally only for one source.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, name: &str, source: Option<PackageSource>) -> Result<usize> {
        let normalized = normalize_name(name);
        let before = self.entries.len();
        self.entries.retain(|key, _| {
            let mut parts = key.split('|');
            let (Some(cached_name), Some(cached_source)) = (parts.next(), parts.next()) else {
                return true;
            };
            let source_matches = source.is_none_or(|s| s.as_str() == cached_source);
            !(cached_name == normalized && source_matches)
        });

        let removed = before - self.entries.len();
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let document = CacheDocument {
            schema_version: CACHE_SCHEMA_VERSION,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, CacheEntry> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return BTreeMap::new();
    };
    let raw: Value = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("discarding unreadable cache {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    if raw.get("schema_version").and_then(Value::as_u64) != Some(CACHE_SCHEMA_VERSION) {
        tracing::debug!("discarding cache {} with other schema", path.display());
        return BTreeMap::new();
    }
    let Some(entries) = raw.get("entries").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    entries
        .iter()
        .filter_map(|(key, value)| {
            let entry = serde_json::from_value(value.clone()).ok()?;
            Some((key.clone(), entry))
        })
        .collect()
}
