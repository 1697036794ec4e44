//! Name → best candidate plus ranked alternates.
//!
//! [`Resolver`] ties the pieces together: the installed lookup short-circuits
//! names that are already configured, the revision-keyed cache answers
//! repeated lookups, and everything else goes through the search shortcuts or
//! the parallel multi-source search.
//!
//! ```no_run
//! use nxresolve::{Resolver, ResolverConfig, SourcePreferences};
//!
//! # async fn demo() -> nxresolve::Result<()> {
//! let config = ResolverConfig::from_env().with_repo(".");
//! let mut resolver = Resolver::new(&config)?;
//! let resolution = resolver.resolve("rg", &SourcePreferences::default()).await;
//! println!("{} -> {:?}", resolution.name, resolution.best.attr);
//! # Ok(())
//! # }
//! ```

use crate::api::CatalogApi;
use crate::availability::{CachedProbe, NixPlatformProbe, PlatformProbe, Selection, select_installable};
use crate::cache::ResolutionCache;
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::installed::{ConfigScan, InstalledLookup, NoInstalledLookup};
use crate::lock::RevisionMap;
use crate::nix::{NIXPKGS, NIXPKGS_UNSTABLE, NixCommand, NixTool, eval_first};
use crate::platform::Availability;
use crate::rank::rank;
use crate::search::{SearchOptions, Sources};
use crate::source::{
    Candidate, ExplicitTarget, PackageSource, SourcePreferences, detect_language_package,
    normalize_name,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of resolving one name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Name as requested
    pub name: String,
    pub best: Candidate,
    /// Remaining ranked candidates, best excluded
    pub alternates: Vec<Candidate>,
    pub from_cache: bool,
}

impl Resolution {
    fn single(name: &str, best: Candidate) -> Self {
        Self {
            name: name.to_string(),
            best,
            alternates: Vec::new(),
            from_cache: false,
        }
    }

    fn ranked(name: &str, mut ranked: Vec<Candidate>, from_cache: bool) -> Self {
        let best = if ranked.is_empty() {
            Candidate::not_found(name)
        } else {
            ranked.remove(0)
        };
        Self {
            name: name.to_string(),
            best,
            alternates: ranked,
            from_cache,
        }
    }

    pub fn is_found(&self) -> bool {
        self.best.source != PackageSource::NotFound
    }

    pub fn is_installed(&self) -> bool {
        self.best.source == PackageSource::Installed
    }

    /// Best candidate followed by the alternates.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        std::iter::once(&self.best).chain(self.alternates.iter())
    }
}

/// Collaborators for [`Resolver::with_parts`].
pub struct ResolverParts {
    pub sources: Sources,
    pub nix: Arc<dyn NixTool>,
    pub probe: Arc<dyn PlatformProbe>,
    pub installed: Arc<dyn InstalledLookup>,
    pub cache: Option<ResolutionCache>,
    pub options: SearchOptions,
    pub eval_timeout: Duration,
}

pub struct Resolver {
    sources: Sources,
    nix: Arc<dyn NixTool>,
    probe: Arc<dyn PlatformProbe>,
    installed: Arc<dyn InstalledLookup>,
    cache: Option<ResolutionCache>,
    options: SearchOptions,
    eval_timeout: Duration,
}

impl Resolver {
    /// Resolver over the real `nix` binary and the Homebrew API.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let nix: Arc<dyn NixTool> = Arc::new(NixCommand);
        let catalog = Arc::new(CatalogApi::new(config.catalog_timeout)?);
        let probe = Arc::new(NixPlatformProbe::new(nix.clone(), config.eval_timeout));

        let installed: Arc<dyn InstalledLookup> = match &config.repo_root {
            Some(root) => Arc::new(ConfigScan::new(root)),
            None => Arc::new(NoInstalledLookup),
        };

        let cache = config.use_cache.then(|| {
            let revisions = config
                .flake_lock
                .as_deref()
                .map(RevisionMap::from_lock_file)
                .unwrap_or_default();
            ResolutionCache::open(&config.cache_dir, revisions)
        });

        Ok(Self::with_parts(ResolverParts {
            sources: Sources::standard(nix.clone(), catalog, config),
            nix,
            probe,
            installed,
            cache,
            options: SearchOptions::from(config),
            eval_timeout: config.eval_timeout,
        }))
    }

    pub fn with_parts(parts: ResolverParts) -> Self {
        Self {
            sources: parts.sources,
            nix: parts.nix,
            probe: Arc::new(CachedProbe::new(parts.probe)),
            installed: parts.installed,
            cache: parts.cache,
            options: parts.options,
            eval_timeout: parts.eval_timeout,
        }
    }

    pub fn cache(&self) -> Option<&ResolutionCache> {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut ResolutionCache> {
        self.cache.as_mut()
    }

    /// Resolve one name. Never fails: the worst outcome is a not-found
    /// placeholder.
    pub async fn resolve(&mut self, name: &str, prefs: &SourcePreferences) -> Resolution {
        if let Some(location) = self.installed.find_existing(&requested_names(name)) {
            return Resolution::single(name, Candidate::installed(name, location));
        }

        let cached = self
            .cache
            .as_ref()
            .map(|cache| cache.get_all(name))
            .unwrap_or_default();
        if !cached.is_empty() {
            if let Some(location) = self.find_installed(&cached) {
                return Resolution::single(name, Candidate::installed(name, location));
            }
            tracing::debug!("cache hit for '{}' ({} sources)", name, cached.len());
            return Resolution::ranked(name, rank(cached, prefs.bleeding_edge), true);
        }

        let found: Vec<Candidate> = self
            .search(name, prefs)
            .await
            .into_iter()
            .filter(|candidate| {
                let valid = candidate.is_installable();
                if !valid {
                    tracing::debug!("dropping {} candidate without attribute", candidate.source);
                }
                valid
            })
            .collect();

        if found.is_empty() {
            return Resolution::single(name, Candidate::not_found(name));
        }
        if let Some(location) = self.find_installed(&found) {
            return Resolution::single(name, Candidate::installed(name, location));
        }

        if let Some(cache) = self.cache.as_mut() {
            if let Err(e) = cache.set_many(&found) {
                tracing::warn!("failed to write cache {}: {}", cache.path().display(), e);
            }
        }

        Resolution::ranked(name, found, false)
    }

    /// Resolve several names in order.
    pub async fn resolve_many<S: AsRef<str>>(
        &mut self,
        names: &[S],
        prefs: &SourcePreferences,
    ) -> Vec<Resolution> {
        let mut resolutions = Vec::with_capacity(names.len());
        for name in names {
            resolutions.push(self.resolve(name.as_ref(), prefs).await);
        }
        resolutions
    }

    /// Platform compatibility of a nix attribute (memoized per process).
    pub async fn check_available(&self, attr: &str) -> Availability {
        self.probe.check(attr).await
    }

    /// Pick what to install for a resolution, falling back within its source.
    pub async fn select_installable(&self, resolution: &Resolution) -> Selection {
        select_installable(&resolution.best, &resolution.alternates, self.probe.as_ref()).await
    }

    /// Shortcuts first, then the full ranked search.
    async fn search(&self, name: &str, prefs: &SourcePreferences) -> Vec<Candidate> {
        if let Some(adapter) = self.sources.forced_adapter(prefs) {
            return match adapter.search(name).await {
                Ok(found) => rank(found, prefs.bleeding_edge),
                Err(e) => {
                    tracing::warn!("search source '{}' failed for '{}': {}", adapter.source(), name, e);
                    Vec::new()
                }
            };
        }

        if let Some(candidate) = explicit_candidate(name, prefs.explicit_target) {
            return vec![candidate];
        }

        if let Some(candidate) = self.language_override(name).await {
            return vec![candidate];
        }

        self.sources.search(name, prefs, &self.options).await
    }

    /// `python3Packages.rich` and friends: trust the attribute if it evaluates
    /// and builds here.
    async fn language_override(&self, name: &str) -> Option<Candidate> {
        let lang = detect_language_package(name)?;
        if !self.nix.available() {
            return None;
        }

        let exists = eval_first(
            self.nix.as_ref(),
            &[NIXPKGS, NIXPKGS_UNSTABLE],
            &format!("{name}.name"),
            self.eval_timeout,
        )
        .await
        .is_some();
        if !exists {
            tracing::warn!("skipping language override '{}': attribute not found in nixpkgs", name);
            return None;
        }

        if let Availability::Unavailable { reason } = self.probe.check(name).await {
            tracing::warn!("skipping language override '{}': {}", name, reason);
            return None;
        }

        Some(Candidate {
            attr: Some(name.to_string()),
            confidence: 1.0,
            description: format!("{} package", lang.runtime),
            ..Candidate::new(name, PackageSource::Nixpkgs)
        })
    }

    fn find_installed(&self, candidates: &[Candidate]) -> Option<String> {
        candidates
            .iter()
            .find_map(|candidate| self.installed.find_existing(&lookup_names(candidate)))
    }
}

/// Synthetic candidate for `--cask` / `--mas`.
fn explicit_candidate(name: &str, target: ExplicitTarget) -> Option<Candidate> {
    let (source, description) = match target {
        ExplicitTarget::Any => return None,
        ExplicitTarget::Cask => (PackageSource::Cask, "GUI application (cask)"),
        ExplicitTarget::Mas => (PackageSource::Mas, "Mac App Store app"),
    };
    Some(Candidate {
        attr: Some(name.to_string()),
        confidence: 1.0,
        description: description.to_string(),
        ..Candidate::new(name, source)
    })
}

/// Alias-mapped name first, then the name as typed if it differs.
fn requested_names(name: &str) -> Vec<String> {
    let mapped = normalize_name(name);
    if mapped.eq_ignore_ascii_case(name) {
        vec![mapped]
    } else {
        vec![mapped, name.to_string()]
    }
}

/// Names a candidate could appear under in the configuration.
fn lookup_names(candidate: &Candidate) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in [Some(candidate.name.as_str()), candidate.attr.as_deref()]
        .into_iter()
        .flatten()
    {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    if let Some(lang) = candidate.attr.as_deref().and_then(detect_language_package) {
        if !names.contains(&lang.bare_name) {
            names.push(lang.bare_name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_names_include_bare_language_name() {
        let candidate = Candidate {
            attr: Some("python3Packages.rich".to_string()),
            ..Candidate::new("rich", PackageSource::Nixpkgs)
        };
        assert_eq!(
            lookup_names(&candidate),
            vec!["rich".to_string(), "python3Packages.rich".to_string()]
        );
    }

    #[test]
    fn test_requested_names_try_alias_first() {
        assert_eq!(requested_names("rg"), vec!["ripgrep".to_string(), "rg".to_string()]);
        assert_eq!(requested_names("jq"), vec!["jq".to_string()]);
        assert_eq!(requested_names("SDL2"), vec!["sdl2".to_string()]);
    }

    #[test]
    fn test_explicit_candidates() {
        assert!(explicit_candidate("firefox", ExplicitTarget::Any).is_none());
        let cask = explicit_candidate("firefox", ExplicitTarget::Cask).unwrap();
        assert_eq!(cask.source, PackageSource::Cask);
        assert_eq!(cask.attr.as_deref(), Some("firefox"));
        let mas = explicit_candidate("Xcode", ExplicitTarget::Mas).unwrap();
        assert_eq!(mas.description, "Mac App Store app");
        assert!((mas.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolution_ranked_splits_best() {
        let a = Candidate {
            attr: Some("a".to_string()),
            ..Candidate::new("x", PackageSource::Nixpkgs)
        };
        let b = Candidate {
            attr: Some("b".to_string()),
            ..Candidate::new("x", PackageSource::Homebrew)
        };
        let resolution = Resolution::ranked("x", vec![a.clone(), b.clone()], false);
        assert_eq!(resolution.best, a);
        assert_eq!(resolution.alternates, vec![b]);
        assert_eq!(resolution.candidates().count(), 2);

        let empty = Resolution::ranked("x", Vec::new(), false);
        assert!(!empty.is_found());
    }
}
