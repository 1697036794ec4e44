//! Access to `nix search` and `nix eval`.
//!
//! [`NixTool`] is the seam between the adapters and the real `nix` binary.
//! Every method answers `None` instead of failing: a missing tool, a failed
//! evaluation, and an empty result all look the same to callers.

use crate::shell::{command_available, run_json_command};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Flake reference for the pinned package set.
pub const NIXPKGS: &str = "nixpkgs";
/// Flake reference for the rolling unstable channel.
pub const NIXPKGS_UNSTABLE: &str = "github:nixos/nixpkgs/nixos-unstable";
/// Flake reference for the Nix User Repository.
pub const NUR: &str = "github:nix-community/NUR";

#[async_trait]
pub trait NixTool: Send + Sync {
    /// Whether the tool can be invoked at all.
    fn available(&self) -> bool;

    /// `nix search --json <target> <term>`
    async fn search(&self, target: &str, term: &str, timeout: Duration) -> Option<Value>;

    /// `nix eval --json <target>#<attr>`
    async fn eval(&self, target: &str, attr: &str, timeout: Duration) -> Option<Value>;
}

/// [`NixTool`] backed by the `nix` binary on PATH.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixCommand;

#[async_trait]
impl NixTool for NixCommand {
    fn available(&self) -> bool {
        command_available("nix")
    }

    async fn search(&self, target: &str, term: &str, timeout: Duration) -> Option<Value> {
        match run_json_command("nix", &["search", "--json", target, term], timeout).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("nix search {} {} failed: {}", target, term, e);
                None
            }
        }
    }

    async fn eval(&self, target: &str, attr: &str, timeout: Duration) -> Option<Value> {
        let reference = format!("{target}#{attr}");
        match run_json_command("nix", &["eval", "--json", &reference], timeout).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("nix eval {} failed: {}", reference, e);
                None
            }
        }
    }
}

/// Evaluate an attribute against each target in order, returning the first answer.
pub async fn eval_first(
    tool: &dyn NixTool,
    targets: &[&str],
    attr: &str,
    timeout: Duration,
) -> Option<Value> {
    for target in targets {
        if let Some(value) = tool.eval(target, attr, timeout).await {
            return Some(value);
        }
    }
    None
}

/// One hit from `nix search --json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    #[serde(default)]
    pub attr_path: String,
    #[serde(default)]
    pub pname: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parse `nix search` output.
///
/// Newer nix prints a map of `attrPath -> {pname, version, description}`; some
/// versions print a list of entries carrying their own `attrPath`.
pub fn parse_search_entries(data: &Value) -> Vec<SearchEntry> {
    match data {
        Value::Object(map) => map
            .iter()
            .map(|(attr_path, value)| {
                let mut entry: SearchEntry =
                    serde_json::from_value(value.clone()).unwrap_or_default();
                if entry.attr_path.is_empty() {
                    entry.attr_path = attr_path.clone();
                }
                entry
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Drop the `legacyPackages.<system>.` prefix from a search attribute path.
pub fn clean_attr_path(attr_path: &str) -> &str {
    attr_path
        .strip_prefix("legacyPackages.")
        .and_then(|rest| rest.split_once('.'))
        .map_or(attr_path, |(_system, path)| path)
}
