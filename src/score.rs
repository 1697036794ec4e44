//! Confidence scoring for search hits.
//!
//! [`score_match`] is a pure function of its three inputs. Cached rankings and
//! test fixtures depend on it returning the same value for the same arguments.

use crate::source::compact_name;

/// Prefix `nix search` puts in front of every attribute path.
const NAMESPACE_PREFIX: &str = "legacyPackages.";

/// Cap on the penalty for attributes nested under intermediate sets.
const MAX_NESTING_PENALTY: f64 = 0.3;

/// Attribute segments after the namespace prefix (`legacyPackages.<system>.`).
fn package_segments(attr_path: &str) -> Vec<&str> {
    let parts: Vec<&str> = attr_path.split('.').collect();
    if attr_path.starts_with(NAMESPACE_PREFIX) {
        parts.into_iter().skip(2).collect()
    } else {
        parts
    }
}

/// Score how well `attr_path` matches `search_term`, from 0.0 to 1.0.
///
/// Root-level packages (`ripgrep`) beat nested ones
/// (`chickenPackages.eggs.redis`): every extra namespace segment costs 0.1, up
/// to 0.3. Separator-insensitive comparison only ever raises the score, so
/// `pyyaml` matches `py-yaml` without beating a literal hit. A package name
/// equal to the term, ignoring case and separators, scores like an exact
/// package-name hit.
pub fn score_match(search_term: &str, attr_path: &str, primary_name: &str) -> f64 {
    let segments = package_segments(attr_path);
    let tail = attr_path.rsplit('.').next().unwrap_or(attr_path);

    let is_root = segments.len() == 1;
    let extra_depth = segments.len().saturating_sub(1);
    let nesting_penalty = (0.1 * extra_depth as f64).min(MAX_NESTING_PENALTY);

    let search_lower = search_term.to_lowercase();
    let tail_lower = tail.to_lowercase();

    let mut score = 0.3;
    if tail_lower.contains(&search_lower) {
        score = 0.45;
    }
    if tail_lower.starts_with(&search_lower) {
        score = 0.60;
    }
    if tail.starts_with(search_term) {
        score = 0.65;
    }
    if tail_lower == search_lower {
        score = 0.75;
    }
    if tail == search_term {
        score = if is_root { 0.98 } else { 0.80 };
    }
    if primary_name == search_term {
        score = if is_root { 1.0 } else { 0.85 };
    }

    let search_compact = compact_name(&search_lower);
    let tail_compact = compact_name(&tail_lower);
    if !search_compact.is_empty() {
        let floor = if tail_compact == search_compact {
            if is_root { 0.95 } else { 0.82 }
        } else if tail_compact.starts_with(&search_compact) {
            0.68
        } else if tail_compact.contains(&search_compact) {
            0.52
        } else {
            0.0
        };
        score = f64::max(score, floor);

        // attributes whose tail differs from their package name (`_1password-cli`)
        if compact_name(&primary_name.to_lowercase()) == search_compact {
            score = f64::max(score, if is_root { 1.0 } else { 0.85 });
        }
    }

    (score - nesting_penalty).max(0.0)
}

/// Whether the attribute sits directly under the package set.
pub fn is_root_level(attr_path: &str) -> bool {
    package_segments(attr_path).len() == 1
}
