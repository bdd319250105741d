//! Platform configuration.
//!
//! # Responsibility
//! - Hold settings that services receive at construction time.
//! - Parse and validate JSON configuration documents.
//!
//! # Invariants
//! - Services never read settings from process-global state.
//! - A validated config has a non-empty owner allow-list and
//!   `0 < default_limit <= max_limit`.

use crate::model::owner::OwnerKind;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;

/// Ownership policy switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    /// Owner kinds that entities may be assigned to.
    pub allowed_owner_kinds: BTreeSet<OwnerKind>,
    /// Whether users may own projects directly.
    pub allow_user_projects: bool,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            allowed_owner_kinds: OwnerKind::ALL.into_iter().collect(),
            allow_user_projects: true,
        }
    }
}

impl OwnershipConfig {
    pub fn allows(&self, kind: OwnerKind) -> bool {
        self.allowed_owner_kinds.contains(&kind)
    }
}

/// List pagination bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl PaginationConfig {
    /// Applies default and upper bound to a requested limit.
    ///
    /// `Some(0)` is treated as absent.
    pub fn normalize_limit(&self, limit: Option<u32>) -> u32 {
        match limit {
            Some(0) | None => self.default_limit,
            Some(value) if value > self.max_limit => self.max_limit,
            Some(value) => value,
        }
    }
}

/// Log backend settings consumed by `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; `None` keeps logging off.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub ownership: OwnershipConfig,
    pub pagination: PaginationConfig,
    /// Root of on-disk project/job artifacts.
    pub artifacts_root: Option<PathBuf>,
    pub logging: LoggingConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    EmptyOwnerAllowList,
    InvalidPagination { default_limit: u32, max_limit: u32 },
    RelativeArtifactsRoot(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid configuration document: {err}"),
            Self::EmptyOwnerAllowList => {
                write!(f, "ownership.allowed_owner_kinds must not be empty")
            }
            Self::InvalidPagination {
                default_limit,
                max_limit,
            } => write!(
                f,
                "pagination requires 0 < default_limit ({default_limit}) <= max_limit ({max_limit})"
            ),
            Self::RelativeArtifactsRoot(path) => write!(
                f,
                "artifacts_root must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl PlatformConfig {
    /// Parses and validates a JSON document. Missing sections use defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PlatformConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ownership.allowed_owner_kinds.is_empty() {
            return Err(ConfigError::EmptyOwnerAllowList);
        }
        let PaginationConfig {
            default_limit,
            max_limit,
        } = self.pagination;
        if default_limit == 0 || default_limit > max_limit {
            return Err(ConfigError::InvalidPagination {
                default_limit,
                max_limit,
            });
        }
        if let Some(root) = self.artifacts_root.as_ref() {
            if !root.is_absolute() {
                return Err(ConfigError::RelativeArtifactsRoot(root.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PaginationConfig, PlatformConfig};
    use crate::model::owner::OwnerKind;

    #[test]
    fn empty_document_yields_defaults() {
        let config = PlatformConfig::from_json_str("{}").expect("empty config should parse");
        assert!(config.ownership.allow_user_projects);
        for kind in OwnerKind::ALL {
            assert!(config.ownership.allows(kind));
        }
        assert_eq!(config.pagination, PaginationConfig::default());
        assert!(config.artifacts_root.is_none());
    }

    #[test]
    fn partial_ownership_section_overrides_only_given_fields() {
        let config = PlatformConfig::from_json_str(
            r#"{"ownership": {"allowed_owner_kinds": ["organization"]}}"#,
        )
        .expect("config should parse");
        assert!(config.ownership.allows(OwnerKind::Organization));
        assert!(!config.ownership.allows(OwnerKind::User));
        assert!(config.ownership.allow_user_projects);
    }

    #[test]
    fn rejects_empty_allow_list_and_bad_pagination() {
        let err = PlatformConfig::from_json_str(r#"{"ownership": {"allowed_owner_kinds": []}}"#)
            .expect_err("empty allow-list must fail");
        assert!(matches!(err, ConfigError::EmptyOwnerAllowList));

        let err = PlatformConfig::from_json_str(
            r#"{"pagination": {"default_limit": 50, "max_limit": 10}}"#,
        )
        .expect_err("default above max must fail");
        assert!(matches!(err, ConfigError::InvalidPagination { .. }));
    }

    #[test]
    fn rejects_unknown_owner_kind_and_relative_root() {
        assert!(matches!(
            PlatformConfig::from_json_str(r#"{"ownership": {"allowed_owner_kinds": ["project"]}}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PlatformConfig::from_json_str(r#"{"artifacts_root": "relative/dir"}"#),
            Err(ConfigError::RelativeArtifactsRoot(_))
        ));
    }

    #[test]
    fn normalize_limit_defaults_and_clamps() {
        let pagination = PaginationConfig::default();
        assert_eq!(pagination.normalize_limit(None), 20);
        assert_eq!(pagination.normalize_limit(Some(0)), 20);
        assert_eq!(pagination.normalize_limit(Some(7)), 7);
        assert_eq!(pagination.normalize_limit(Some(5000)), 100);
    }
}
