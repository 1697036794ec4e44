use super::{MIN_CONFIDENCE, SourceAdapter, finish_candidates};
use crate::error::Result;
use crate::nix::{
    NIXPKGS, NIXPKGS_UNSTABLE, NUR, NixTool, SearchEntry, clean_attr_path, parse_search_entries,
};
use crate::score::score_match;
use crate::source::{
    Candidate, PackageSource, normalize_name, search_name_variants, truncate_description,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// `nix search` against one or more flake targets (nixpkgs or NUR).
///
/// Targets are tried in order per search variant; the first target that
/// answers wins for that variant.
pub struct NixSearch {
    tool: Arc<dyn NixTool>,
    source: PackageSource,
    targets: Vec<&'static str>,
    timeout: Duration,
    flake_url: Option<&'static str>,
}

impl NixSearch {
    /// Pinned nixpkgs, falling back to unstable (or the reverse).
    pub fn nixpkgs(tool: Arc<dyn NixTool>, prefer_unstable: bool, timeout: Duration) -> Self {
        let targets = if prefer_unstable {
            vec![NIXPKGS_UNSTABLE, NIXPKGS]
        } else {
            vec![NIXPKGS, NIXPKGS_UNSTABLE]
        };
        Self {
            tool,
            source: PackageSource::Nixpkgs,
            targets,
            timeout,
            flake_url: None,
        }
    }

    /// NUR; every hit needs the NUR flake input added first.
    pub fn nur(tool: Arc<dyn NixTool>, timeout: Duration) -> Self {
        Self {
            tool,
            source: PackageSource::Nur,
            targets: vec![NUR],
            timeout,
            flake_url: Some(NUR),
        }
    }

    async fn collect_entries(&self, name: &str) -> Vec<SearchEntry> {
        let mut entries = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for variant in search_name_variants(name) {
            for target in &self.targets {
                let Some(data) = self.tool.search(target, &variant, self.timeout).await else {
                    continue;
                };
                for entry in parse_search_entries(&data) {
                    if !entry.attr_path.is_empty() && seen.insert(entry.attr_path.clone()) {
                        entries.push(entry);
                    }
                }
                break;
            }
        }

        entries
    }

    fn to_candidate(&self, name: &str, requested: &str, entry: &SearchEntry) -> Option<Candidate> {
        let pname = entry.pname.as_deref().unwrap_or_default();
        let confidence = score_match(requested, &entry.attr_path, pname);
        if confidence < MIN_CONFIDENCE {
            return None;
        }

        Some(Candidate {
            name: name.to_string(),
            source: self.source,
            attr: Some(clean_attr_path(&entry.attr_path).to_string()),
            version: entry.version.clone().filter(|v| !v.is_empty()),
            confidence,
            description: truncate_description(entry.description.as_deref().unwrap_or_default()),
            requires_flake_input: self.flake_url.is_some(),
            flake_url: self.flake_url.map(String::from),
        })
    }
}

#[async_trait]
impl SourceAdapter for NixSearch {
    fn source(&self) -> PackageSource {
        self.source
    }

    async fn search(&self, name: &str) -> Result<Vec<Candidate>> {
        if !self.tool.available() {
            return Ok(Vec::new());
        }

        let requested = normalize_name(name);
        let entries = self.collect_entries(name).await;
        let candidates = entries
            .iter()
            .filter_map(|entry| self.to_candidate(name, &requested, entry))
            .collect();

        Ok(finish_candidates(candidates))
    }
}
