use super::SourceAdapter;
use crate::api::CatalogLookup;
use crate::error::Result;
use crate::source::{Candidate, PackageSource, truncate_description};
use async_trait::async_trait;
use std::sync::Arc;

const FORMULA_CONFIDENCE: f64 = 0.8;
const CASK_CONFIDENCE: f64 = 1.0;

/// Formula or cask catalog lookup by exact name.
///
/// Catalog hits are exact-name lookups rather than fuzzy searches, so they
/// carry a fixed confidence instead of a score.
pub struct Catalog {
    lookup: Arc<dyn CatalogLookup>,
    source: PackageSource,
}

impl Catalog {
    pub fn formulae(lookup: Arc<dyn CatalogLookup>) -> Self {
        Self {
            lookup,
            source: PackageSource::Homebrew,
        }
    }

    pub fn casks(lookup: Arc<dyn CatalogLookup>) -> Self {
        Self {
            lookup,
            source: PackageSource::Cask,
        }
    }

    async fn formula_candidate(&self, name: &str) -> Option<Candidate> {
        let formula = self.lookup.formula(name).await?;
        Some(Candidate {
            attr: Some(formula.name),
            version: formula.versions.stable,
            confidence: FORMULA_CONFIDENCE,
            description: truncate_description(formula.desc.as_deref().unwrap_or_default()),
            ..Candidate::new(name, PackageSource::Homebrew)
        })
    }

    async fn cask_candidate(&self, name: &str) -> Option<Candidate> {
        let cask = self.lookup.cask(name).await?;
        let description = cask
            .desc
            .filter(|desc| !desc.is_empty())
            .unwrap_or_else(|| "GUI application".to_string());
        Some(Candidate {
            attr: Some(cask.token),
            version: cask.version,
            confidence: CASK_CONFIDENCE,
            description: truncate_description(&description),
            ..Candidate::new(name, PackageSource::Cask)
        })
    }
}

#[async_trait]
impl SourceAdapter for Catalog {
    fn source(&self) -> PackageSource {
        self.source
    }

    async fn search(&self, name: &str) -> Result<Vec<Candidate>> {
        if name.is_empty() {
            return Ok(Vec::new());
        }
        let candidate = match self.source {
            PackageSource::Cask => self.cask_candidate(name).await,
            _ => self.formula_candidate(name).await,
        };
        Ok(candidate.into_iter().collect())
    }
}
