//! Core resolution types: package sources, candidates, and name normalization.
//!
//! Every lookup goes through [`normalize_name`] before it is scored or used as a
//! cache key, so `vim`, `nvim` and `Neovim` all share one history.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptions longer than this are cut to 97 characters plus `...`.
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// A backend a candidate can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageSource {
    /// Package provided by an overlay already pinned in flake.lock
    FlakeInput,
    /// The pinned nixpkgs input
    #[serde(rename = "nxs")]
    Nixpkgs,
    /// Nix User Repository (needs a new flake input)
    Nur,
    /// Homebrew formula
    Homebrew,
    /// Homebrew cask
    Cask,
    /// Mac App Store app
    Mas,
    /// Already present in the user's configuration
    Installed,
    /// Placeholder for a name no source could resolve
    NotFound,
}

impl PackageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageSource::FlakeInput => "flake-input",
            PackageSource::Nixpkgs => "nxs",
            PackageSource::Nur => "nur",
            PackageSource::Homebrew => "homebrew",
            PackageSource::Cask => "cask",
            PackageSource::Mas => "mas",
            PackageSource::Installed => "installed",
            PackageSource::NotFound => "not-found",
        }
    }

    /// Parse a user-supplied source name (case-insensitive, `brew` accepted).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "flake-input" | "flake" => Some(PackageSource::FlakeInput),
            "nxs" | "nixpkgs" => Some(PackageSource::Nixpkgs),
            "nur" => Some(PackageSource::Nur),
            "homebrew" | "brew" => Some(PackageSource::Homebrew),
            "cask" => Some(PackageSource::Cask),
            "mas" => Some(PackageSource::Mas),
            _ => None,
        }
    }

    /// Sources whose candidates are meaningless without an attribute path.
    pub fn requires_attr(&self) -> bool {
        matches!(
            self,
            PackageSource::Nixpkgs | PackageSource::Nur | PackageSource::FlakeInput
        )
    }

    /// Low-priority fallback catalogs.
    pub fn is_catalog(&self) -> bool {
        matches!(self, PackageSource::Homebrew | PackageSource::Cask)
    }

    /// Placeholder sources never reach the cache.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, PackageSource::Installed | PackageSource::NotFound)
    }

    /// flake.lock node whose revision keys this source's cache entries.
    ///
    /// Overlay candidates are keyed by the overlay inputs themselves, see
    /// [`RevisionMap::for_source`](crate::lock::RevisionMap::for_source).
    pub fn lock_input(&self) -> &'static str {
        match self {
            PackageSource::Nixpkgs => "nixpkgs",
            PackageSource::Homebrew | PackageSource::Cask => "homebrew",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scored match for a name within one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Search term as typed
    pub name: String,
    pub source: PackageSource,
    /// Attribute path, formula name, cask token, or config location
    pub attr: Option<String>,
    pub version: Option<String>,
    /// Match quality in `0.0..=1.0`
    pub confidence: f64,
    pub description: String,
    /// Choosing this candidate means adding a flake input first
    pub requires_flake_input: bool,
    pub flake_url: Option<String>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, source: PackageSource) -> Self {
        Self {
            name: name.into(),
            source,
            attr: None,
            version: None,
            confidence: 0.0,
            description: String::new(),
            requires_flake_input: false,
            flake_url: None,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            description: "Not found in any source".to_string(),
            ..Self::new(name, PackageSource::NotFound)
        }
    }

    pub fn installed(name: impl Into<String>, location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            confidence: 1.0,
            description: format!("Already at {location}"),
            attr: Some(location),
            ..Self::new(name, PackageSource::Installed)
        }
    }

    /// A candidate the downstream editor may act on.
    ///
    /// Nix-backed sources without an attribute are resolution failures, not
    /// usable results.
    pub fn is_installable(&self) -> bool {
        if self.source == PackageSource::NotFound {
            return false;
        }
        if self.source.requires_attr() {
            return self.attr.as_deref().is_some_and(|attr| !attr.is_empty());
        }
        true
    }
}

/// Explicit target requested by the caller (`--cask` / `--mas`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplicitTarget {
    #[default]
    Any,
    Cask,
    Mas,
}

/// Per-call source selection preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcePreferences {
    /// Prefer overlays and NUR over the pinned nixpkgs
    pub bleeding_edge: bool,
    /// Search NUR even without `bleeding_edge`
    pub nur: bool,
    /// Query only this source (`nxs`, `unstable`, `nur`, `homebrew`)
    pub force_source: Option<String>,
    pub explicit_target: ExplicitTarget,
}

/// Common shorthand mapped to the canonical nixpkgs attribute.
fn alias_for(lower: &str) -> Option<&'static str> {
    let mapped = match lower {
        // nix attrs can't start with a digit
        "1password-cli" => "_1password-cli",
        "1password" => "_1password-gui",
        "nvim" | "vim" => "neovim",
        "python" | "python3" => "python3",
        "py-yaml" | "py_yaml" => "pyyaml",
        "node" | "nodejs" => "nodejs",
        "rg" => "ripgrep",
        "fd-find" => "fd",
        // macOS ships BSD versions
        "grep" => "gnugrep",
        "sed" => "gnused",
        "make" => "gnumake",
        "tar" => "gnutar",
        "find" => "findutils",
        _ => return None,
    };
    Some(mapped)
}

/// Resolve an alias case-insensitively, keeping the original spelling otherwise.
pub fn mapped_name(name: &str) -> String {
    alias_for(&name.to_lowercase())
        .map(str::to_string)
        .unwrap_or_else(|| name.to_string())
}

/// Alias-mapped, lower-cased name used for scoring and cache keys.
pub fn normalize_name(name: &str) -> String {
    mapped_name(name).to_lowercase()
}

/// Strip `-`, `_` and `.` separators.
pub fn compact_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | '.'))
        .collect()
}

/// Up to three distinct query strings: mapped alias, original, and compact forms.
pub fn search_name_variants(name: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    for candidate in [mapped_name(name), name.to_string()] {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate.clone());
        }
        let compact = compact_name(&candidate);
        if !compact.is_empty() && !variants.contains(&compact) {
            variants.push(compact);
        }
    }
    variants.truncate(3);
    variants
}

/// Cut long descriptions on a character boundary.
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        let head: String = description.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}

/// A package living inside a language package set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePackage {
    pub bare_name: String,
    pub runtime: &'static str,
}

const LANGUAGE_PREFIXES: &[(&str, &str)] = &[
    ("python3Packages.", "python3"),
    ("python311Packages.", "python3"),
    ("python312Packages.", "python3"),
    ("python313Packages.", "python3"),
    ("python314Packages.", "python3"),
    ("luaPackages.", "lua5_4"),
    ("lua51Packages.", "lua5_1"),
    ("lua52Packages.", "lua5_2"),
    ("lua53Packages.", "lua5_3"),
    ("lua54Packages.", "lua5_4"),
    ("perlPackages.", "perl"),
    ("rubyPackages.", "ruby"),
    ("haskellPackages.", "haskellPackages.ghc"),
    ("nodePackages.", "nodejs"),
];

/// Detect names like `python3Packages.rich`.
pub fn detect_language_package(name: &str) -> Option<LanguagePackage> {
    LANGUAGE_PREFIXES.iter().find_map(|&(prefix, runtime)| {
        name.strip_prefix(prefix)
            .filter(|bare| !bare.is_empty())
            .map(|bare| LanguagePackage {
                bare_name: bare.to_string(),
                runtime,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_aliases() {
        assert_eq!(normalize_name("py-yaml"), "pyyaml");
        assert_eq!(normalize_name("py_yaml"), "pyyaml");
        assert_eq!(normalize_name("nvim"), "neovim");
        assert_eq!(normalize_name("vim"), "neovim");
        assert_eq!(normalize_name("rg"), "ripgrep");
        assert_eq!(normalize_name("1password"), "_1password-gui");
    }

    #[test]
    fn test_normalize_passthrough_and_case() {
        assert_eq!(normalize_name("ripgrep"), "ripgrep");
        assert_eq!(normalize_name("Firefox"), "firefox");
        assert_eq!(normalize_name("Nvim"), "neovim");
        assert_eq!(normalize_name("PY-YAML"), "pyyaml");
    }

    #[test]
    fn test_search_variants() {
        assert_eq!(search_name_variants("py-yaml"), vec!["pyyaml", "py-yaml"]);
        assert_eq!(search_name_variants("ripgrep"), vec!["ripgrep"]);
        assert_eq!(
            search_name_variants("font-awesome"),
            vec!["font-awesome", "fontawesome"]
        );
        assert!(search_name_variants("a-b.c_d").len() <= 3);
    }

    #[test]
    fn test_truncate_description() {
        let long = "x".repeat(150);
        let cut = truncate_description(&long);
        assert_eq!(cut.chars().count(), 100);
        assert!(cut.ends_with("..."));

        let exact = "y".repeat(100);
        assert_eq!(truncate_description(&exact), exact);

        // multi-byte characters must not split
        let wide = "é".repeat(120);
        assert_eq!(truncate_description(&wide).chars().count(), 100);
    }

    #[test]
    fn test_installable_requires_attr_for_nix_sources() {
        let mut candidate = Candidate::new("ripgrep", PackageSource::Nixpkgs);
        assert!(!candidate.is_installable());
        candidate.attr = Some(String::new());
        assert!(!candidate.is_installable());
        candidate.attr = Some("ripgrep".to_string());
        assert!(candidate.is_installable());

        assert!(Candidate::new("firefox", PackageSource::Cask).is_installable());
        assert!(!Candidate::not_found("nothing").is_installable());
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(PackageSource::parse("BrEw"), Some(PackageSource::Homebrew));
        assert_eq!(PackageSource::parse("nxs"), Some(PackageSource::Nixpkgs));
        assert_eq!(PackageSource::parse("flakehub"), None);
    }

    #[test]
    fn test_source_serde_names() {
        let json = serde_json::to_string(&PackageSource::Nixpkgs).unwrap();
        assert_eq!(json, "\"nxs\"");
        let json = serde_json::to_string(&PackageSource::FlakeInput).unwrap();
        assert_eq!(json, "\"flake-input\"");
        let json = serde_json::to_string(&PackageSource::NotFound).unwrap();
        assert_eq!(json, "\"not-found\"");
    }

    #[test]
    fn test_detect_language_package() {
        let pkg = detect_language_package("python3Packages.rich").unwrap();
        assert_eq!(pkg.bare_name, "rich");
        assert_eq!(pkg.runtime, "python3");
        assert!(detect_language_package("ripgrep").is_none());
        assert!(detect_language_package("python3Packages.").is_none());
    }
}
