//! Formula and cask catalog lookups over the public Homebrew JSON API.
//!
//! `https://formulae.brew.sh/api/{formula,cask}/<name>.json` answers the
//! same metadata as `brew info --json=v2` without Homebrew being installed.
//! Answers (including misses) are memoized for the life of the client.
//!
//! Adapters only see [`CatalogLookup`], so they run without network access in
//! tests.

use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const CATALOG_BASE: &str = "https://formulae.brew.sh/api";

/// Memoized formula answers per client
pub const FORMULA_CACHE_CAPACITY: u64 = 1000;
/// Memoized cask answers per client
pub const CASK_CACHE_CAPACITY: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub versions: Versions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub stable: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cask {
    pub token: String,
    /// Display names
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Name-based lookup in the formula and cask catalogs.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn formula(&self, name: &str) -> Option<Formula>;
    async fn cask(&self, token: &str) -> Option<Cask>;
}

#[derive(Clone)]
pub struct CatalogApi {
    client: reqwest::Client,
    formulae: Cache<String, Option<Formula>>,
    casks: Cache<String, Option<Cask>>,
}

impl CatalogApi {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("nxr/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            formulae: Cache::new(FORMULA_CACHE_CAPACITY),
            casks: Cache::new(CASK_CACHE_CAPACITY),
        })
    }

    /// GET `{kind}/{name}.json`; a 404 is a clean miss.
    async fn fetch<T: DeserializeOwned>(&self, kind: &str, name: &str) -> Result<Option<T>> {
        let url = format!("{CATALOG_BASE}/{kind}/{name}.json");
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }

    pub async fn fetch_formula(&self, name: &str) -> Result<Option<Formula>> {
        if let Some(known) = self.formulae.get(name).await {
            return Ok(known);
        }
        let answer = self.fetch::<Formula>("formula", name).await?;
        self.formulae.insert(name.to_string(), answer.clone()).await;
        Ok(answer)
    }

    pub async fn fetch_cask(&self, token: &str) -> Result<Option<Cask>> {
        if let Some(known) = self.casks.get(token).await {
            return Ok(known);
        }
        let answer = self.fetch::<Cask>("cask", token).await?;
        self.casks.insert(token.to_string(), answer.clone()).await;
        Ok(answer)
    }
}

#[async_trait]
impl CatalogLookup for CatalogApi {
    async fn formula(&self, name: &str) -> Option<Formula> {
        self.fetch_formula(name).await.unwrap_or_else(|e| {
            tracing::debug!("formula lookup for {} failed: {}", name, e);
            None
        })
    }

    async fn cask(&self, token: &str) -> Option<Cask> {
        self.fetch_cask(token).await.unwrap_or_else(|e| {
            tracing::debug!("cask lookup for {} failed: {}", token, e);
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_ignores_unknown_fields() {
        let formula: Formula = serde_json::from_str(
            r#"{"name": "ripgrep", "versions": {"stable": "14.1.1", "head": "HEAD"}, "tap": "homebrew/core"}"#,
        )
        .unwrap();
        assert_eq!(formula.name, "ripgrep");
        assert_eq!(formula.versions.stable.as_deref(), Some("14.1.1"));
        assert!(formula.desc.is_none());
    }

    #[test]
    fn test_cask_defaults() {
        let cask: Cask =
            serde_json::from_str(r#"{"token": "firefox", "name": ["Mozilla Firefox"]}"#).unwrap();
        assert_eq!(cask.token, "firefox");
        assert_eq!(cask.name, vec!["Mozilla Firefox"]);
        assert!(cask.version.is_none());
    }

    #[test]
    fn test_formula_without_versions() {
        let formula: Formula = serde_json::from_str(r#"{"name": "wget"}"#).unwrap();
        assert!(formula.versions.stable.is_none());
    }
}
