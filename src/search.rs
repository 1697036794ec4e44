//! Parallel multi-source search.
//!
//! Primary sources run concurrently on a bounded pool under one shared
//! deadline. A source that errors, panics, or misses the deadline contributes
//! nothing and is reported in [`SearchOutcome`]; the rest of the search
//! carries on. The catalog adapters run afterwards, one at a time, and always
//! add their hits as alternates.

use crate::adapters::{Catalog, FlakeInputs, NixSearch, SourceAdapter};
use crate::api::CatalogLookup;
use crate::config::ResolverConfig;
use crate::nix::NixTool;
use crate::rank::rank;
use crate::source::{Candidate, ExplicitTarget, PackageSource, SourcePreferences};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Shared deadline for the whole parallel group
    pub deadline: Duration,
    pub max_workers: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(45),
            max_workers: 4,
        }
    }
}

impl From<&ResolverConfig> for SearchOptions {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            deadline: config.search_deadline,
            max_workers: config.max_workers.max(1),
        }
    }
}

/// Merged, unranked results of one parallel search.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub candidates: Vec<Candidate>,
    /// Sources that returned an error or panicked
    pub failed: Vec<PackageSource>,
    /// Sources still running when the deadline fired
    pub timed_out: Vec<PackageSource>,
}

impl SearchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() || !self.timed_out.is_empty()
    }
}

enum TaskResult {
    Found(Vec<Candidate>),
    Failed(String),
}

/// Run `adapters` concurrently for `name`.
///
/// Never fails: whatever finished before the deadline is returned. Tasks still
/// running at the deadline are aborted, which drops their subprocesses.
pub async fn parallel_search(
    name: &str,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    options: &SearchOptions,
) -> SearchOutcome {
    let deadline = Instant::now() + options.deadline;
    let semaphore = Arc::new(Semaphore::new(options.max_workers.max(1)));
    let mut pending: BTreeMap<usize, PackageSource> = BTreeMap::new();
    let mut set: JoinSet<(usize, TaskResult)> = JoinSet::new();

    for (index, adapter) in adapters.into_iter().enumerate() {
        pending.insert(index, adapter.source());
        let semaphore = Arc::clone(&semaphore);
        let name = name.to_string();

        set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (index, TaskResult::Failed("worker pool closed".to_string()));
            };
            let result = AssertUnwindSafe(adapter.search(&name)).catch_unwind().await;
            let outcome = match result {
                Ok(Ok(candidates)) => TaskResult::Found(candidates),
                Ok(Err(e)) => TaskResult::Failed(e.to_string()),
                Err(_) => TaskResult::Failed("adapter panicked".to_string()),
            };
            (index, outcome)
        });
    }

    let mut outcome = SearchOutcome::default();
    loop {
        match timeout_at(deadline, set.join_next()).await {
            Ok(Some(Ok((index, result)))) => {
                let Some(source) = pending.remove(&index) else {
                    continue;
                };
                match result {
                    TaskResult::Found(candidates) => outcome.candidates.extend(candidates),
                    TaskResult::Failed(reason) => {
                        tracing::warn!("search source '{}' failed for '{}': {}", source, name, reason);
                        outcome.failed.push(source);
                    }
                }
            }
            Ok(Some(Err(e))) => {
                // only reachable if a task is cancelled from outside
                tracing::warn!("search task for '{}' did not complete: {}", name, e);
            }
            Ok(None) => break,
            Err(_) => {
                set.abort_all();
                outcome.timed_out = pending.values().copied().collect();
                tracing::warn!(
                    "timed out waiting for {} search source(s) for '{}'; using partial results",
                    outcome.timed_out.len(),
                    name
                );
                break;
            }
        }
    }

    // failed tasks whose index was never reported
    for source in pending.values() {
        if !outcome.timed_out.contains(source) && !outcome.failed.contains(source) {
            outcome.failed.push(*source);
        }
    }

    outcome
}

/// The adapter set used by the resolver.
#[derive(Clone)]
pub struct Sources {
    pub nixpkgs: Arc<dyn SourceAdapter>,
    /// Same package set, unstable channel queried first
    pub unstable: Arc<dyn SourceAdapter>,
    pub nur: Arc<dyn SourceAdapter>,
    pub flake_inputs: Option<Arc<dyn SourceAdapter>>,
    pub formulae: Arc<dyn SourceAdapter>,
    pub casks: Arc<dyn SourceAdapter>,
}

impl Sources {
    /// Real adapters over `nix` and the catalog API.
    pub fn standard(
        nix: Arc<dyn NixTool>,
        catalog: Arc<dyn CatalogLookup>,
        config: &ResolverConfig,
    ) -> Self {
        let flake_inputs = config
            .flake_lock
            .as_ref()
            .map(|path| Arc::new(FlakeInputs::new(path)) as Arc<dyn SourceAdapter>);

        Self {
            nixpkgs: Arc::new(NixSearch::nixpkgs(nix.clone(), false, config.nix_timeout)),
            unstable: Arc::new(NixSearch::nixpkgs(nix.clone(), true, config.nix_timeout)),
            nur: Arc::new(NixSearch::nur(nix, config.nur_timeout)),
            flake_inputs,
            formulae: Arc::new(Catalog::formulae(catalog.clone())),
            casks: Arc::new(Catalog::casks(catalog)),
        }
    }

    /// Adapters for the parallel group.
    ///
    /// nixpkgs always; pinned overlays when a lock file is known; NUR only on
    /// request or with `bleeding_edge`.
    pub fn primary_adapters(&self, prefs: &SourcePreferences) -> Vec<Arc<dyn SourceAdapter>> {
        let mut adapters = vec![Arc::clone(&self.nixpkgs)];
        if let Some(flake_inputs) = &self.flake_inputs {
            adapters.push(Arc::clone(flake_inputs));
        }
        if prefs.nur || prefs.bleeding_edge {
            adapters.push(Arc::clone(&self.nur));
        }
        adapters
    }

    /// Single adapter selected by `force_source`, if the value is known.
    pub fn forced_adapter(&self, prefs: &SourcePreferences) -> Option<Arc<dyn SourceAdapter>> {
        let forced = prefs.force_source.as_deref()?.to_ascii_lowercase();
        let adapter = match forced.as_str() {
            "nxs" | "nixpkgs" => &self.nixpkgs,
            "unstable" => &self.unstable,
            "nur" => &self.nur,
            "homebrew" | "brew" if prefs.explicit_target == ExplicitTarget::Cask => &self.casks,
            "homebrew" | "brew" => &self.formulae,
            _ => return None,
        };
        Some(Arc::clone(adapter))
    }

    /// Parallel group, then both catalogs, then rank and dedup.
    pub async fn search(
        &self,
        name: &str,
        prefs: &SourcePreferences,
        options: &SearchOptions,
    ) -> Vec<Candidate> {
        let mut outcome = parallel_search(name, self.primary_adapters(prefs), options).await;

        for catalog in [&self.formulae, &self.casks] {
            match catalog.search(name).await {
                Ok(candidates) => outcome.candidates.extend(candidates),
                Err(e) => tracing::warn!(
                    "search source '{}' failed for '{}': {}",
                    catalog.source(),
                    name,
                    e
                ),
            }
        }

        rank(outcome.candidates, prefs.bleeding_edge)
    }
}
