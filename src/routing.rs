//! Where a chosen candidate goes in the configuration repository.
//!
//! Formulae, casks, App Store apps, and language-set packages each have one
//! fixed manifest. Everything else is a plain nix package, and picking the
//! right manifest for it is delegated to a [`RoutingOracle`].

use crate::source::{Candidate, PackageSource, detect_language_package};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InstallBucket {
    NixManifest,
    LanguagePackage { bare_name: String, runtime: String },
    Formula,
    Cask,
    AppStore,
}

/// Manifest files per fixed bucket, relative to the repository root.
#[derive(Debug, Clone)]
pub struct RoutingTargets {
    pub packages: String,
    pub languages: String,
    pub brews: String,
    pub casks: String,
    pub darwin: String,
}

impl Default for RoutingTargets {
    fn default() -> Self {
        Self {
            packages: "packages/nix/cli.nix".to_string(),
            languages: "packages/nix/languages.nix".to_string(),
            brews: "system/darwin/homebrew/brews.nix".to_string(),
            casks: "system/darwin/homebrew/casks.nix".to_string(),
            darwin: "system/darwin/default.nix".to_string(),
        }
    }
}

/// Answer from the routing oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Path(String),
    Ambiguous(Vec<String>),
    NoAnswer,
}

/// Picks a manifest for packages outside the fixed buckets.
#[async_trait]
pub trait RoutingOracle: Send + Sync {
    async fn decide(&self, package: &str, choices: &[String]) -> RouteDecision;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub bucket: InstallBucket,
    /// Token to write into the manifest
    pub package_token: String,
    pub target: String,
    /// Set when the oracle could not decide and the default target was used
    pub warning: Option<String>,
}

/// Deterministic bucket for a candidate, `None` if it cannot be installed.
pub fn classify(candidate: &Candidate) -> Option<InstallBucket> {
    if !candidate.is_installable() || candidate.source == PackageSource::Installed {
        return None;
    }
    let bucket = match candidate.source {
        PackageSource::Homebrew => InstallBucket::Formula,
        PackageSource::Cask => InstallBucket::Cask,
        PackageSource::Mas => InstallBucket::AppStore,
        _ => match detect_language_package(&package_token(candidate)) {
            Some(lang) => InstallBucket::LanguagePackage {
                bare_name: lang.bare_name,
                runtime: lang.runtime.to_string(),
            },
            None => InstallBucket::NixManifest,
        },
    };
    Some(bucket)
}

fn package_token(candidate: &Candidate) -> String {
    candidate
        .attr
        .clone()
        .filter(|attr| !attr.is_empty())
        .unwrap_or_else(|| candidate.name.clone())
}

/// Route a candidate, consulting `oracle` only for plain nix packages.
pub async fn route_candidate(
    candidate: &Candidate,
    targets: &RoutingTargets,
    choices: &[String],
    oracle: Option<&dyn RoutingOracle>,
) -> Option<Route> {
    let bucket = classify(candidate)?;
    let token = package_token(candidate);

    let (target, warning) = match &bucket {
        InstallBucket::Formula => (targets.brews.clone(), None),
        InstallBucket::Cask => (targets.casks.clone(), None),
        InstallBucket::AppStore => (targets.darwin.clone(), None),
        InstallBucket::LanguagePackage { .. } => (targets.languages.clone(), None),
        InstallBucket::NixManifest => {
            let fallback = targets.packages.clone();
            match oracle {
                None => (fallback, None),
                Some(oracle) => match oracle.decide(&token, choices).await {
                    RouteDecision::Path(path) => (path, None),
                    RouteDecision::Ambiguous(options) => {
                        let warning = format!(
                            "ambiguous routing for {token} ({}); using {fallback}",
                            options.join(", ")
                        );
                        (fallback, Some(warning))
                    }
                    RouteDecision::NoAnswer => {
                        let warning = format!("no routing answer for {token}; using {fallback}");
                        (fallback, Some(warning))
                    }
                },
            }
        }
    };

    Some(Route {
        bucket,
        package_token: token,
        target,
        warning,
    })
}
