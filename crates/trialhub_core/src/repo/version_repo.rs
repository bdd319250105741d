//! Single-row version tracking tables.

use crate::model::version::{VersionKind, VersionRecord};
use crate::repo::{ensure_schema_ready, RepoError, RepoResult, NOW_MS_SQL};
use rusqlite::{params, Connection, OptionalExtension};

const VERSION_COLUMNS: &[&str] = &["id", "latest_version", "min_version", "updated_at"];
const CHART_VERSION_COLUMNS: &[&str] = &["id", "latest_version", "updated_at"];

pub trait VersionRepository {
    fn get_version(&self, kind: VersionKind) -> RepoResult<Option<VersionRecord>>;
    /// Inserts or replaces the single row for `record.kind`.
    fn upsert_version(&self, record: &VersionRecord) -> RepoResult<()>;
}

pub struct SqliteVersionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVersionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                ("cli_versions", VERSION_COLUMNS),
                ("platform_versions", VERSION_COLUMNS),
                ("lib_versions", VERSION_COLUMNS),
                ("chart_versions", CHART_VERSION_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl VersionRepository for SqliteVersionRepository<'_> {
    fn get_version(&self, kind: VersionKind) -> RepoResult<Option<VersionRecord>> {
        let min_column = if kind.has_min_version() {
            "min_version"
        } else {
            "NULL AS min_version"
        };
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT latest_version, {min_column} FROM {} WHERE id = 1;",
                    kind.table()
                ),
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(latest_version, min_version)| VersionRecord {
            kind,
            latest_version,
            min_version,
        }))
    }

    fn upsert_version(&self, record: &VersionRecord) -> RepoResult<()> {
        let table = record.kind.table();
        let key = record.latest_version.as_str();

        if record.kind.has_min_version() {
            let min_version = record.min_version.as_deref().ok_or_else(|| {
                RepoError::InvalidData(format!("{table} requires min_version"))
            })?;
            self.conn
                .execute(
                    &format!(
                        "INSERT INTO {table} (id, latest_version, min_version)
                         VALUES (1, ?1, ?2)
                         ON CONFLICT(id) DO UPDATE SET
                             latest_version = excluded.latest_version,
                             min_version = excluded.min_version,
                             updated_at = {NOW_MS_SQL};"
                    ),
                    params![record.latest_version.as_str(), min_version],
                )
                .map_err(|err| RepoError::from_write(err, "version", key))?;
        } else {
            self.conn
                .execute(
                    &format!(
                        "INSERT INTO {table} (id, latest_version)
                         VALUES (1, ?1)
                         ON CONFLICT(id) DO UPDATE SET
                             latest_version = excluded.latest_version,
                             updated_at = {NOW_MS_SQL};"
                    ),
                    [record.latest_version.as_str()],
                )
                .map_err(|err| RepoError::from_write(err, "version", key))?;
        }
        Ok(())
    }
}
