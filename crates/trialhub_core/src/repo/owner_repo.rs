//! Owner repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist owners and resolve them by id, name or target.
//! - Persist the owner pointer of ownable entities.
//!
//! # Invariants
//! - Owner names and owner targets are unique; collisions surface as
//!   `RepoError::Conflict`.
//! - Deleting an owner still referenced by a project surfaces as
//!   `RepoError::ForeignKey`.

use crate::model::ids::{OrganizationId, OwnerId, TeamId, UserId};
use crate::model::owner::{OwnableRef, Owner, OwnerKind, OwnerTarget};
use crate::repo::{ensure_schema_ready, parse_id, RepoError, RepoResult, NOW_MS_SQL};
use rusqlite::{params, Connection, OptionalExtension, Row};

const OWNER_COLUMNS: &[&str] = &["id", "name", "target_kind", "target_id"];

const OWNER_SELECT_SQL: &str = "SELECT id, name, target_kind, target_id FROM owners";

/// Repository interface for owner rows.
pub trait OwnerRepository {
    fn create_owner(&self, owner: &Owner) -> RepoResult<()>;
    fn get_owner(&self, id: OwnerId) -> RepoResult<Option<Owner>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Owner>>;
    fn find_by_target(&self, target: OwnerTarget) -> RepoResult<Option<Owner>>;
    fn name_exists(&self, name: &str) -> RepoResult<bool>;
    /// Returns `false` when no owner had that name.
    fn delete_by_name(&self, name: &str) -> RepoResult<bool>;
    /// Persists the owner pointer of one ownable entity.
    fn assign_owner(&self, entity: OwnableRef, owner_id: OwnerId) -> RepoResult<()>;
}

/// SQLite-backed owner repository.
pub struct SqliteOwnerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOwnerRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &[("owners", OWNER_COLUMNS)])?;
        Ok(Self { conn })
    }
}

impl OwnerRepository for SqliteOwnerRepository<'_> {
    fn create_owner(&self, owner: &Owner) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO owners (id, name, target_kind, target_id)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    owner.id.to_string(),
                    owner.name.as_str(),
                    owner.kind().as_str(),
                    owner.target.id_text(),
                ],
            )
            .map_err(|err| RepoError::from_write(err, "owner", owner.name.as_str()))?;
        Ok(())
    }

    fn get_owner(&self, id: OwnerId) -> RepoResult<Option<Owner>> {
        self.query_one(
            &format!("{OWNER_SELECT_SQL} WHERE id = ?1;"),
            &[&id.to_string()],
        )
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Owner>> {
        self.query_one(&format!("{OWNER_SELECT_SQL} WHERE name = ?1;"), &[&name])
    }

    fn find_by_target(&self, target: OwnerTarget) -> RepoResult<Option<Owner>> {
        self.query_one(
            &format!("{OWNER_SELECT_SQL} WHERE target_kind = ?1 AND target_id = ?2;"),
            &[&target.kind().as_str(), &target.id_text()],
        )
    }

    fn name_exists(&self, name: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM owners WHERE name = ?1);",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn delete_by_name(&self, name: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM owners WHERE name = ?1;", [name])
            .map_err(|err| RepoError::from_write(err, "owner", name))?;
        Ok(changed > 0)
    }

    fn assign_owner(&self, entity: OwnableRef, owner_id: OwnerId) -> RepoResult<()> {
        let (table, entity_name, key) = match entity {
            OwnableRef::Project(project_id) => ("projects", "project", project_id.to_string()),
        };

        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {table}
                     SET owner_id = ?2,
                         updated_at = {NOW_MS_SQL}
                     WHERE id = ?1;"
                ),
                params![key.as_str(), owner_id.to_string()],
            )
            .map_err(|err| RepoError::from_write(err, entity_name, key.as_str()))?;

        if changed == 0 {
            return Err(RepoError::not_found(entity_name, key));
        }
        Ok(())
    }
}

impl SqliteOwnerRepository<'_> {
    fn query_one(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> RepoResult<Option<Owner>> {
        self.conn
            .query_row(sql, args, |row| Ok(read_owner_columns(row)))
            .optional()?
            .map(|columns| columns.and_then(parse_owner))
            .transpose()
    }
}

struct OwnerColumns {
    id: String,
    name: String,
    target_kind: String,
    target_id: String,
}

fn read_owner_columns(row: &Row<'_>) -> RepoResult<OwnerColumns> {
    Ok(OwnerColumns {
        id: row.get("id")?,
        name: row.get("name")?,
        target_kind: row.get("target_kind")?,
        target_id: row.get("target_id")?,
    })
}

fn parse_owner(columns: OwnerColumns) -> RepoResult<Owner> {
    let kind = OwnerKind::parse(&columns.target_kind).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid owner kind `{}` in owners.target_kind",
            columns.target_kind
        ))
    })?;
    let target_id = columns.target_id.as_str();
    let target = match kind {
        OwnerKind::User => OwnerTarget::User(parse_id::<UserId>(target_id, "owners.target_id")?),
        OwnerKind::Team => OwnerTarget::Team(parse_id::<TeamId>(target_id, "owners.target_id")?),
        OwnerKind::Organization => OwnerTarget::Organization(parse_id::<OrganizationId>(
            target_id,
            "owners.target_id",
        )?),
    };

    Ok(Owner {
        id: parse_id(&columns.id, "owners.id")?,
        name: columns.name,
        target,
    })
}
