//! Source adapters: one per backend, each mapping a name to ranked candidates.
//!
//! Adapters swallow their own tool failures and answer an empty list. The
//! orchestrator still treats an `Err` or a panic as a failed source, so a
//! misbehaving adapter can never take the whole search down.

mod catalog;
mod flake_input;
mod nix_search;

pub use catalog::Catalog;
pub use flake_input::{FlakeInputs, OVERLAY_INPUTS};
pub use nix_search::NixSearch;

use crate::error::Result;
use crate::source::{Candidate, PackageSource};
use async_trait::async_trait;

/// At most this many candidates leave an adapter.
pub const MAX_CANDIDATES: usize = 5;

/// Hits scoring below this are not plausible matches.
pub const MIN_CONFIDENCE: f64 = 0.3;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source every candidate from this adapter carries.
    fn source(&self) -> PackageSource;

    async fn search(&self, name: &str) -> Result<Vec<Candidate>>;
}

/// Sort by descending confidence and keep the top [`MAX_CANDIDATES`].
pub(crate) fn finish_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.truncate(MAX_CANDIDATES);
    candidates
}
