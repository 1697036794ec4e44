use super::{SourceAdapter, finish_candidates};
use crate::error::Result;
use crate::lock::FlakeLock;
use crate::source::{Candidate, PackageSource, normalize_name};
use async_trait::async_trait;
use std::path::PathBuf;

/// Known overlays and the packages they provide.
pub const OVERLAY_INPUTS: &[(&str, &[&str])] = &[
    ("neovim-nightly-overlay", &["neovim", "neovim-nightly"]),
    ("rust-overlay", &["rust", "cargo", "rustc", "rust-analyzer"]),
    ("fenix", &["rust", "cargo", "rustc", "rust-analyzer", "rust-src"]),
    ("emacs-overlay", &["emacs", "emacs-git"]),
    ("zig-overlay", &["zig"]),
    ("nxs-mozilla", &["firefox", "firefox-nightly"]),
];

/// Packages reachable through overlays already pinned in flake.lock.
pub struct FlakeInputs {
    lock_path: PathBuf,
}

impl FlakeInputs {
    pub fn new(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: lock_path.into(),
        }
    }
}

fn provided_by(input: &str) -> &'static [&'static str] {
    OVERLAY_INPUTS
        .iter()
        .find(|(overlay, _)| *overlay == input)
        .map(|(_, packages)| *packages)
        .unwrap_or_default()
}

#[async_trait]
impl SourceAdapter for FlakeInputs {
    fn source(&self) -> PackageSource {
        PackageSource::FlakeInput
    }

    async fn search(&self, name: &str) -> Result<Vec<Candidate>> {
        let requested = normalize_name(name);
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let Ok(content) = tokio::fs::read_to_string(&self.lock_path).await else {
            return Ok(Vec::new());
        };
        let lock: FlakeLock = match serde_json::from_str(&content) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::debug!("ignoring unreadable {}: {}", self.lock_path.display(), e);
                return Ok(Vec::new());
            }
        };

        let mut candidates = Vec::new();
        for input in lock.input_names() {
            for package in provided_by(input) {
                if !(requested.contains(package) || package.contains(requested.as_str())) {
                    continue;
                }
                let mut candidate = Candidate::new(name, PackageSource::FlakeInput);
                candidate.attr = Some(package.to_string());
                candidate.confidence = if *package == requested { 0.9 } else { 0.7 };
                candidate.description = format!("From {input} overlay");
                candidates.push(candidate);
            }
        }

        Ok(finish_candidates(candidates))
    }
}
