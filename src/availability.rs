//! Platform availability checks and same-source fallback.
//!
//! A search hit is only a name match. Before a nix-backed candidate is handed
//! to the editor its `meta.platforms` is checked, and an excluded candidate is
//! swapped for the next compatible alternate from the same source.

use crate::nix::{NIXPKGS, NixTool, eval_first};
use crate::platform::{Availability, check_platforms, current_system};
use crate::source::Candidate;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Distinct attributes remembered per process; a resolve run probes a few
/// per name, so this comfortably covers a long batch.
pub const PROBE_CACHE_CAPACITY: u64 = 512;

/// Answers whether an attribute builds on the current system.
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    async fn check(&self, attr: &str) -> Availability;
}

/// Evaluates `<attr>.meta.platforms` against the pinned nixpkgs.
///
/// Every unanswerable query (no nix, failed eval, no metadata) is reported as
/// available.
pub struct NixPlatformProbe {
    tool: Arc<dyn NixTool>,
    system: String,
    timeout: Duration,
}

impl NixPlatformProbe {
    pub fn new(tool: Arc<dyn NixTool>, timeout: Duration) -> Self {
        Self::for_system(tool, current_system(), timeout)
    }

    pub fn for_system(tool: Arc<dyn NixTool>, system: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool,
            system: system.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PlatformProbe for NixPlatformProbe {
    async fn check(&self, attr: &str) -> Availability {
        if !self.tool.available() {
            return Availability::Available;
        }
        let meta_attr = format!("{attr}.meta.platforms");
        match eval_first(self.tool.as_ref(), &[NIXPKGS], &meta_attr, self.timeout).await {
            Some(platforms) => check_platforms(&platforms, &self.system),
            None => Availability::Available,
        }
    }
}

/// Memoizes another probe for the lifetime of the process.
pub struct CachedProbe {
    inner: Arc<dyn PlatformProbe>,
    cache: moka::future::Cache<String, Availability>,
}

impl CachedProbe {
    pub fn new(inner: Arc<dyn PlatformProbe>) -> Self {
        Self {
            inner,
            cache: moka::future::Cache::new(PROBE_CACHE_CAPACITY),
        }
    }
}

#[async_trait]
impl PlatformProbe for CachedProbe {
    async fn check(&self, attr: &str) -> Availability {
        let inner = Arc::clone(&self.inner);
        let key = attr.to_string();
        self.cache
            .get_with(key, async move { inner.check(attr).await })
            .await
    }
}

/// Outcome of choosing what to install for one resolved name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Selection {
    /// The best candidate is usable as-is.
    Primary(Candidate),
    /// The best candidate was rejected and a same-source alternate replaces it.
    Fallback {
        original: Candidate,
        replacement: Candidate,
        reason: String,
    },
    /// Neither the best candidate nor any alternate is usable.
    Unavailable { candidate: Candidate, reason: String },
}

impl Selection {
    /// Candidate to install, if any.
    pub fn chosen(&self) -> Option<&Candidate> {
        match self {
            Selection::Primary(candidate) => Some(candidate),
            Selection::Fallback { replacement, .. } => Some(replacement),
            Selection::Unavailable { .. } => None,
        }
    }
}

fn needs_platform_check(candidate: &Candidate) -> bool {
    candidate.source.requires_attr() && candidate.attr.as_deref().is_some_and(|a| !a.is_empty())
}

/// Check the primary candidate and walk same-source alternates on rejection.
///
/// Alternates are taken in their ranked order and each one is re-checked; the
/// first compatible alternate with a different attribute wins.
pub async fn select_installable(
    primary: &Candidate,
    alternates: &[Candidate],
    probe: &dyn PlatformProbe,
) -> Selection {
    let Some(attr) = primary.attr.as_deref().filter(|_| needs_platform_check(primary)) else {
        return Selection::Primary(primary.clone());
    };

    let reason = match probe.check(attr).await {
        Availability::Available => return Selection::Primary(primary.clone()),
        Availability::Unavailable { reason } => reason,
    };

    for alternate in alternates {
        if alternate.source != primary.source || alternate.attr == primary.attr {
            continue;
        }
        let Some(alt_attr) = alternate.attr.as_deref().filter(|a| !a.is_empty()) else {
            continue;
        };
        if !probe.check(alt_attr).await.is_available() {
            tracing::debug!("alternate {} also unavailable", alt_attr);
            continue;
        }
        return Selection::Fallback {
            original: primary.clone(),
            replacement: alternate.clone(),
            reason,
        };
    }

    Selection::Unavailable {
        candidate: primary.clone(),
        reason,
    }
}
