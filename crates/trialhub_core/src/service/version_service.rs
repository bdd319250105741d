//! Component version tracking.

use crate::model::validation::ValidationError;
use crate::model::version::{VersionKind, VersionRecord, VERSION_MAX_LEN};
use crate::repo::version_repo::VersionRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum VersionError {
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for VersionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VersionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ValidationError> for VersionError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for VersionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub struct VersionService<R: VersionRepository> {
    repo: R,
}

impl<R: VersionRepository> VersionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and stores the version row for `record.kind`.
    ///
    /// Chart records drop any `min_version`.
    pub fn set_version(&self, record: VersionRecord) -> Result<VersionRecord, VersionError> {
        let latest_version = check_version("latest_version", Some(&record.latest_version))?;
        let min_version = if record.kind.has_min_version() {
            Some(check_version("min_version", record.min_version.as_deref())?)
        } else {
            None
        };

        let record = VersionRecord {
            kind: record.kind,
            latest_version,
            min_version,
        };
        self.repo.upsert_version(&record)?;
        Ok(record)
    }

    pub fn get_version(&self, kind: VersionKind) -> Result<Option<VersionRecord>, VersionError> {
        Ok(self.repo.get_version(kind)?)
    }
}

fn check_version(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    if trimmed.chars().count() > VERSION_MAX_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: VERSION_MAX_LEN,
        });
    }
    Ok(trimmed.to_string())
}
