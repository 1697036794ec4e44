// Test helpers for isolated resolver testing
// Provides temporary repositories and stub collaborators so no test touches
// nix, the network, or the user's cache.
#![allow(dead_code)]

use async_trait::async_trait;
use nxresolve::adapters::SourceAdapter;
use nxresolve::availability::PlatformProbe;
use nxresolve::installed::{ConfigScan, InstalledLookup, NoInstalledLookup};
use nxresolve::lock::RevisionMap;
use nxresolve::nix::NixTool;
use nxresolve::search::{SearchOptions, Sources};
use nxresolve::{
    Availability, Candidate, PackageSource, ResolutionCache, ResolveError, Resolver, ResolverParts,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Isolated test environment using temporary directories
/// Automatically cleaned up when dropped (RAII pattern)
///
/// - temp/
///   - repo/    (configuration repository with flake.lock and .nix files)
///   - cache/   (resolution cache)
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub repo: PathBuf,
    pub cache: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let repo = temp_dir.path().join("repo");
        let cache = temp_dir.path().join("cache");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::create_dir_all(&cache).unwrap();

        Self {
            temp_dir,
            repo,
            cache,
        }
    }

    /// Write a flake.lock pinning each `(input, rev)`.
    pub fn write_lock(&self, inputs: &[(&str, &str)]) -> PathBuf {
        let mut nodes = serde_json::Map::new();
        nodes.insert("root".to_string(), serde_json::json!({}));
        for (input, rev) in inputs {
            nodes.insert(
                input.to_string(),
                serde_json::json!({"locked": {"type": "github", "rev": rev}}),
            );
        }
        let path = self.repo.join("flake.lock");
        let lock = serde_json::json!({"version": 7, "nodes": nodes});
        std::fs::write(&path, serde_json::to_string_pretty(&lock).unwrap()).unwrap();
        path
    }

    /// Write a `.nix` file relative to the repository.
    pub fn write_nix(&self, relative: &str, content: &str) {
        let path = self.repo.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn open_cache(&self, revisions: RevisionMap) -> ResolutionCache {
        ResolutionCache::open(&self.cache, revisions)
    }

    pub fn scan(&self) -> Arc<dyn InstalledLookup> {
        Arc::new(ConfigScan::new(&self.repo))
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

pub enum Behavior {
    Return(Vec<Candidate>),
    Fail,
    Sleep(Duration),
}

/// Adapter answering canned results and counting calls.
pub struct StubAdapter {
    source: PackageSource,
    behavior: Behavior,
    pub calls: AtomicUsize,
}

impl StubAdapter {
    pub fn new(source: PackageSource, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            source,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn empty(source: PackageSource) -> Arc<Self> {
        Self::new(source, Behavior::Return(Vec::new()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn source(&self) -> PackageSource {
        self.source
    }

    async fn search(&self, name: &str) -> nxresolve::Result<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Return(hits) => Ok(hits
                .iter()
                .cloned()
                .map(|hit| Candidate {
                    name: name.to_string(),
                    ..hit
                })
                .collect()),
            Behavior::Fail => Err(ResolveError::ToolMissing("nix".to_string())),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Candidate with an attribute and confidence.
pub fn hit(source: PackageSource, attr: &str, confidence: f64) -> Candidate {
    Candidate {
        attr: Some(attr.to_string()),
        confidence,
        description: format!("{attr} from {source}"),
        ..Candidate::new("", source)
    }
}

/// Adapter set where every source is a stub.
pub struct StubSources {
    pub nixpkgs: Arc<StubAdapter>,
    pub nur: Arc<StubAdapter>,
    pub flake_inputs: Option<Arc<StubAdapter>>,
    pub formulae: Arc<StubAdapter>,
    pub casks: Arc<StubAdapter>,
}

impl StubSources {
    pub fn empty() -> Self {
        Self {
            nixpkgs: StubAdapter::empty(PackageSource::Nixpkgs),
            nur: StubAdapter::empty(PackageSource::Nur),
            flake_inputs: None,
            formulae: StubAdapter::empty(PackageSource::Homebrew),
            casks: StubAdapter::empty(PackageSource::Cask),
        }
    }

    pub fn sources(&self) -> Sources {
        Sources {
            nixpkgs: self.nixpkgs.clone(),
            unstable: self.nixpkgs.clone(),
            nur: self.nur.clone(),
            flake_inputs: self
                .flake_inputs
                .clone()
                .map(|adapter| adapter as Arc<dyn SourceAdapter>),
            formulae: self.formulae.clone(),
            casks: self.casks.clone(),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.nixpkgs.calls()
            + self.nur.calls()
            + self.formulae.calls()
            + self.casks.calls()
            + self.flake_inputs.as_ref().map_or(0, |a| a.calls())
    }
}

/// `nix` stand-in answering `eval` from a table.
#[derive(Default)]
pub struct StubNix {
    pub evals: HashMap<String, Value>,
}

#[async_trait]
impl NixTool for StubNix {
    fn available(&self) -> bool {
        true
    }

    async fn search(&self, _target: &str, _term: &str, _timeout: Duration) -> Option<Value> {
        None
    }

    async fn eval(&self, _target: &str, attr: &str, _timeout: Duration) -> Option<Value> {
        self.evals.get(attr).cloned()
    }
}

/// Probe rejecting a fixed set of attributes.
#[derive(Default)]
pub struct StubProbe {
    pub unavailable: Vec<String>,
}

impl StubProbe {
    pub fn rejecting(attrs: &[&str]) -> Self {
        Self {
            unavailable: attrs.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[async_trait]
impl PlatformProbe for StubProbe {
    async fn check(&self, attr: &str) -> Availability {
        if self.unavailable.iter().any(|a| a == attr) {
            Availability::Unavailable {
                reason: format!("not available on test-system (only: x86_64-linux) [{attr}]"),
            }
        } else {
            Availability::Available
        }
    }
}

/// Builder for a resolver wired entirely to stubs.
pub struct TestResolver {
    pub nix: StubNix,
    pub probe: StubProbe,
    pub installed: Arc<dyn InstalledLookup>,
    pub cache: Option<ResolutionCache>,
    pub deadline: Duration,
}

impl Default for TestResolver {
    fn default() -> Self {
        Self {
            nix: StubNix::default(),
            probe: StubProbe::default(),
            installed: Arc::new(NoInstalledLookup),
            cache: None,
            deadline: Duration::from_millis(300),
        }
    }
}

impl TestResolver {
    pub fn build(self, sources: &StubSources) -> Resolver {
        Resolver::with_parts(ResolverParts {
            sources: sources.sources(),
            nix: Arc::new(self.nix),
            probe: Arc::new(self.probe),
            installed: self.installed,
            cache: self.cache,
            options: SearchOptions {
                deadline: self.deadline,
                max_workers: 4,
            },
            eval_timeout: Duration::from_secs(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_directories() {
        let env = TestEnvironment::new();
        assert!(env.repo.exists());
        assert!(env.cache.exists());
    }

    #[test]
    fn test_environment_cleanup() {
        let repo = {
            let env = TestEnvironment::new();
            env.repo.clone()
        };
        assert!(!repo.exists());
    }

    #[test]
    fn test_lock_revisions_are_readable() {
        let env = TestEnvironment::new();
        let lock = env.write_lock(&[("nixpkgs", "0123456789abcdef0123")]);
        let revisions = RevisionMap::from_lock_file(&lock);
        assert_eq!(revisions.get("nixpkgs"), "0123456789ab");
    }
}
