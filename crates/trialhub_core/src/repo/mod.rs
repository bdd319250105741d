//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Translate store constraint failures into semantic errors.
//!
//! # Invariants
//! - Repositories refuse connections whose schema is not fully migrated.
//! - Unique violations surface as `RepoError::Conflict`, foreign-key
//!   violations as `RepoError::ForeignKey`; never as raw SQLite errors.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::{ffi, Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod account_repo;
pub mod dependent_repo;
pub mod owner_repo;
pub mod project_repo;
pub mod version_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all SQLite repositories.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Addressed row does not exist.
    NotFound { entity: &'static str, key: String },
    /// Write collides with a unique constraint.
    Conflict { entity: &'static str, key: String },
    /// Write references a missing row, or delete is blocked by references.
    ForeignKey { entity: &'static str, key: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict { entity, key } => write!(f, "{entity} already exists: {key}"),
            Self::ForeignKey { entity, key } => {
                write!(f, "{entity} reference constraint failed: {key}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Classifies a write failure, keeping `entity`/`key` for constraint errors.
    pub(crate) fn from_write(err: rusqlite::Error, entity: &'static str, key: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            if failure.code == ErrorCode::ConstraintViolation {
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return Self::Conflict {
                            entity,
                            key: key.to_string(),
                        };
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        return Self::ForeignKey {
                            entity,
                            key: key.to_string(),
                        };
                    }
                    _ => {}
                }
            }
        }
        err.into()
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Checks migration version and required table columns.
pub(crate) fn ensure_schema_ready(
    conn: &Connection,
    required: &[(&'static str, &'static [&'static str])],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

/// Parses a typed id column value.
pub(crate) fn parse_id<T: FromStr>(value: &str, column: &'static str) -> RepoResult<T> {
    value
        .parse::<T>()
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// SQL expression for the current time in epoch milliseconds.
pub(crate) const NOW_MS_SQL: &str = "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
