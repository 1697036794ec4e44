//! "Already configured?" lookup over a repository's `.nix` files.

use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds where a package is already configured.
pub trait InstalledLookup: Send + Sync {
    /// Location (`<file>:<line>`) of the first name found, if any.
    fn find_existing(&self, names: &[String]) -> Option<String>;
}

/// Never reports anything as installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstalledLookup;

impl InstalledLookup for NoInstalledLookup {
    fn find_existing(&self, _names: &[String]) -> Option<String> {
        None
    }
}

/// Pattern scan of `*.nix` files under a repository root.
///
/// A name counts as configured when a line lists it on its own, as
/// `pkgs.<name>`, quoted, or as a `programs.`/`services.`/launchd agent
/// entry. Matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct ConfigScan {
    root: PathBuf,
}

impl ConfigScan {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `.nix` files in a stable order, skipping hidden dirs and `result` links.
    fn nix_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !(name.starts_with('.') || name == "result")
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "nix"))
            .collect();
        files.sort();
        files
    }

    fn scan_file(&self, path: &Path, name: &str, patterns: &[Regex]) -> Option<String> {
        let content = std::fs::read_to_string(path).ok()?;
        let line_no = content.lines().position(|line| {
            !line.trim_start().starts_with('#')
                && !is_alias_target(line, name)
                && patterns.iter().any(|pattern| pattern.is_match(line))
        })?;
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        Some(format!("{}:{}", relative.display(), line_no + 1))
    }

    fn find_name(&self, files: &[PathBuf], name: &str) -> Option<String> {
        let patterns = match config_patterns(name) {
            Ok(patterns) => patterns,
            Err(e) => {
                tracing::debug!("no config patterns for '{}': {}", name, e);
                return None;
            }
        };
        files
            .par_iter()
            .find_map_first(|path| self.scan_file(path, name, &patterns))
    }
}

impl InstalledLookup for ConfigScan {
    /// Names are tried in order; the first one found anywhere wins.
    fn find_existing(&self, names: &[String]) -> Option<String> {
        let names: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return None;
        }
        let files = self.nix_files();
        names.into_iter().find_map(|name| self.find_name(&files, name))
    }
}

/// Line patterns under which `name` counts as configured.
fn config_patterns(name: &str) -> Result<Vec<Regex>, regex::Error> {
    let name = regex::escape(name);
    [
        format!(r"(?i)^\s+{name}\s*(#.*)?$"),
        format!(r"(?i)^\s+pkgs\.{name}\b"),
        format!(r#"(?i)^\s*"{name}""#),
        format!(r"(?i)^\s*programs\.{name}(?:\.enable|\s*=)"),
        format!(r"(?i)^\s*services\.{name}(?:\.enable|\s*=)"),
        format!(r"(?i)^\s*launchd\.(?:user\.)?agents\.{name}\s*="),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern))
    .collect()
}

/// `foo = "name";` maps an alias onto `name`; it does not configure it.
fn is_alias_target(line: &str, name: &str) -> bool {
    line.split_once('=')
        .is_some_and(|(_, rhs)| rhs.contains(&format!("\"{name}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let packages = dir.path().join("packages/nix");
        std::fs::create_dir_all(&packages).unwrap();
        std::fs::write(
            packages.join("cli.nix"),
            "{ pkgs, ... }:\n{\n  home.packages = with pkgs; [\n    # ripgrep-all\n    ripgrep\n    fd # finder\n  ];\n}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("home.nix"),
            "{ pkgs, ... }:\n{\n  home.packages = [\n    pkgs.jq\n  ];\n  programs.git.enable = true;\n  services.syncthing = { enable = true; };\n  launchd.user.agents.ollama = { };\n}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("brews.nix"),
            "{\n  homebrew.brews = [\n    \"Mas\"\n  ];\n  aliases.vim = \"neovim\";\n}\n",
        )
        .unwrap();
        let hidden = dir.path().join(".git");
        std::fs::create_dir_all(&hidden).unwrap();
        std::fs::write(hidden.join("stale.nix"), "  bat\n").unwrap();
        dir
    }

    fn find(scan: &ConfigScan, items: &[&str]) -> Option<String> {
        let names: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        scan.find_existing(&names)
    }

    #[test]
    fn test_bare_list_entry_with_location() {
        let dir = repo();
        let scan = ConfigScan::new(dir.path());
        assert_eq!(find(&scan, &["ripgrep"]), Some("packages/nix/cli.nix:5".to_string()));
        assert_eq!(find(&scan, &["fd"]), Some("packages/nix/cli.nix:6".to_string()));
    }

    #[test]
    fn test_pkgs_prefixed_entry() {
        let dir = repo();
        let scan = ConfigScan::new(dir.path());
        assert_eq!(find(&scan, &["jq"]), Some("home.nix:4".to_string()));
    }

    #[test]
    fn test_program_service_and_agent_modules() {
        let dir = repo();
        let scan = ConfigScan::new(dir.path());
        assert_eq!(find(&scan, &["git"]), Some("home.nix:6".to_string()));
        assert_eq!(find(&scan, &["syncthing"]), Some("home.nix:7".to_string()));
        assert_eq!(find(&scan, &["ollama"]), Some("home.nix:8".to_string()));
    }

    #[test]
    fn test_quoted_entry_is_case_insensitive() {
        let dir = repo();
        let scan = ConfigScan::new(dir.path());
        assert_eq!(find(&scan, &["mas"]), Some("brews.nix:3".to_string()));
    }

    #[test]
    fn test_non_matches() {
        let dir = repo();
        let scan = ConfigScan::new(dir.path());
        assert!(find(&scan, &["rip"]).is_none());
        assert!(find(&scan, &["ripgrep-all"]).is_none(), "comments skipped");
        assert!(find(&scan, &["bat"]).is_none(), "hidden dirs skipped");
        assert!(find(&scan, &["neovim"]).is_none(), "alias targets are not entries");
        assert!(find(&scan, &["pkgs"]).is_none());
    }

    #[test]
    fn test_names_tried_in_order() {
        let dir = repo();
        let scan = ConfigScan::new(dir.path());
        assert_eq!(find(&scan, &["nothing", "git", "jq"]), Some("home.nix:6".to_string()));
        assert!(find(&scan, &[]).is_none());
        assert!(NoInstalledLookup.find_existing(&["fd".to_string()]).is_none());
    }

    #[test]
    fn test_names_are_escaped() {
        assert!(config_patterns("c++").is_ok());
        let patterns = config_patterns("python3Packages.rich").unwrap();
        assert!(patterns.iter().any(|p| p.is_match("    python3Packages.rich")));
        assert!(!patterns.iter().any(|p| p.is_match("    python3PackagesXrich")));
    }
}
