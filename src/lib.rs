//! Library interface for nxresolve (nxr)
//!
//! Resolves a package name to ranked install candidates across nixpkgs, NUR,
//! pinned flake overlays, and the Homebrew formula and cask catalogs.

pub mod adapters;
pub mod api;
pub mod availability;
pub mod cache;
pub mod config;
pub mod error;
pub mod installed;
pub mod lock;
pub mod nix;
pub mod platform;
pub mod rank;
pub mod resolver;
pub mod routing;
pub mod score;
pub mod search;
pub mod shell;
pub mod source;

// Re-export commonly used types
pub use availability::Selection;
pub use cache::ResolutionCache;
pub use config::ResolverConfig;
pub use error::{ResolveError, Result};
pub use platform::Availability;
pub use resolver::{Resolution, Resolver, ResolverParts};
pub use score::score_match;
pub use source::{Candidate, ExplicitTarget, PackageSource, SourcePreferences, normalize_name};
