//! Merge ordering: source priority first, confidence second.

use crate::source::{Candidate, PackageSource};
use std::collections::HashSet;

/// Rank of a source in the merged list; lower sorts first.
pub fn source_priority(source: PackageSource, bleeding_edge: bool) -> u8 {
    match source {
        PackageSource::FlakeInput => 0,
        PackageSource::Nur if bleeding_edge => 1,
        PackageSource::Nixpkgs if bleeding_edge => 2,
        PackageSource::Nixpkgs => 1,
        PackageSource::Nur => 2,
        PackageSource::Homebrew => 3,
        PackageSource::Cask => 4,
        PackageSource::Mas => 5,
        _ => 99,
    }
}

/// Stable sort by `(priority, -confidence)`.
pub fn sort_candidates(candidates: &mut [Candidate], bleeding_edge: bool) {
    candidates.sort_by(|a, b| {
        source_priority(a.source, bleeding_edge)
            .cmp(&source_priority(b.source, bleeding_edge))
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
}

/// Keep the first occurrence of every `(source, attr)` pair.
pub fn deduplicate(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<(PackageSource, Option<String>)> = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert((c.source, c.attr.clone())))
        .collect()
}

/// Sort then deduplicate; the result order is independent of arrival order
/// for distinct `(source, attr, confidence)` inputs.
pub fn rank(mut candidates: Vec<Candidate>, bleeding_edge: bool) -> Vec<Candidate> {
    sort_candidates(&mut candidates, bleeding_edge);
    deduplicate(candidates)
}
