//! Platform detection for availability checks.
//!
//! Nix identifies systems as `<arch>-<os>`, for example `aarch64-darwin` or
//! `x86_64-linux`. A package's `meta.platforms` lists the systems it builds
//! on; a package whose list excludes the current system cannot be installed.
//!
//! # Examples
//!
//! ```
//! use nxresolve::platform::{self, Availability};
//! use serde_json::json;
//!
//! let platforms = json!(["x86_64-linux", "aarch64-linux"]);
//! let verdict = platform::check_platforms(&platforms, "aarch64-darwin");
//! assert!(!verdict.is_available());
//! ```

use serde::Serialize;
use serde_json::Value;

/// Result of a platform compatibility query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Availability::Available => None,
            Availability::Unavailable { reason } => Some(reason),
        }
    }
}

/// Nix system identifier of the running machine.
///
/// Returns strings such as `aarch64-darwin` or `x86_64-linux`.
pub fn current_system() -> String {
    // Rust already reports "aarch64" where uname says "arm64"
    let arch = std::env::consts::ARCH;

    #[cfg(target_os = "macos")]
    let os = "darwin";
    #[cfg(not(target_os = "macos"))]
    let os = std::env::consts::OS;

    format!("{arch}-{os}")
}

/// Decide availability from a `meta.platforms` value.
///
/// Anything other than a non-empty list of strings is treated as "can't tell"
/// and allowed.
pub fn check_platforms(platforms: &Value, current: &str) -> Availability {
    let Some(items) = platforms.as_array() else {
        return Availability::Available;
    };

    let supported: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
    if supported.is_empty() || supported.contains(&current) {
        return Availability::Available;
    }

    Availability::Unavailable {
        reason: format!(
            "not available on {current} (only: {})",
            supported.join(", ")
        ),
    }
}
