//! Component version tracking records.

use serde::{Deserialize, Serialize};

/// Maximum stored length of a version string.
pub const VERSION_MAX_LEN: usize = 16;

/// Component whose version is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Cli,
    Platform,
    Lib,
    /// Deployment chart; carries only `latest_version`.
    Chart,
}

impl VersionKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Cli => "cli_versions",
            Self::Platform => "platform_versions",
            Self::Lib => "lib_versions",
            Self::Chart => "chart_versions",
        }
    }

    pub fn has_min_version(self) -> bool {
        !matches!(self, Self::Chart)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub kind: VersionKind,
    pub latest_version: String,
    pub min_version: Option<String>,
}
