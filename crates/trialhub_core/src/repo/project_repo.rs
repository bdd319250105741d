//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist projects and answer visibility-filtered, paginated lists.
//! - Delete projects; dependents are removed by store-level cascade.
//! - Track per-user bookmarks.
//!
//! # Invariants
//! - Inserts require an owner pointer.
//! - Lists are ordered `updated_at DESC, id ASC`.

use crate::model::ids::{ProjectId, UserId};
use crate::model::project::Project;
use crate::repo::{
    bool_to_int, ensure_schema_ready, parse_bool, parse_id, RepoError, RepoResult, NOW_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

const PROJECT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "description",
    "is_public",
    "user_id",
    "owner_id",
    "created_at",
    "updated_at",
];
const OWNER_COLUMNS: &[&str] = &["id", "name", "target_kind", "target_id"];
const BOOKMARK_COLUMNS: &[&str] = &["user_id", "project_id", "created_at"];

const PROJECT_SELECT_SQL: &str = "SELECT
    p.id AS id,
    p.name AS name,
    p.description AS description,
    p.is_public AS is_public,
    p.user_id AS user_id,
    p.owner_id AS owner_id,
    p.created_at AS created_at,
    p.updated_at AS updated_at
FROM projects p
INNER JOIN owners o ON o.id = p.owner_id";

/// Row-level visibility applied to project lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectVisibility {
    All,
    PublicOnly,
    /// Public projects plus those created by or user-owned by this user.
    PublicOrOwnedBy(UserId),
}

/// Query options for listing projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectListQuery {
    /// Restricts to projects whose owner has this name.
    pub owner_name: Option<String>,
    pub visibility: ProjectVisibility,
    pub limit: u32,
    pub offset: u32,
}

/// One page of projects plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRows {
    pub items: Vec<Project>,
    pub total: u64,
}

pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Looks a project up by its owner's name and its own name.
    fn find_by_owner_and_name(&self, owner_name: &str, name: &str)
        -> RepoResult<Option<Project>>;
    /// Rewrites mutable fields and bumps `updated_at`.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<ProjectRows>;
    /// Returns `false` when the bookmark already existed.
    fn add_bookmark(&self, user_id: UserId, project_id: ProjectId) -> RepoResult<bool>;
    /// Returns `false` when there was no bookmark to remove.
    fn remove_bookmark(&self, user_id: UserId, project_id: ProjectId) -> RepoResult<bool>;
    /// Subset of `project_ids` bookmarked by `user_id`.
    fn bookmarked_among(
        &self,
        user_id: UserId,
        project_ids: &[ProjectId],
    ) -> RepoResult<BTreeSet<ProjectId>>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                ("projects", PROJECT_COLUMNS),
                ("owners", OWNER_COLUMNS),
                ("project_bookmarks", BOOKMARK_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<()> {
        let owner_id = project.owner_id.ok_or_else(|| {
            RepoError::InvalidData(format!("project {} has no owner assigned", project.id))
        })?;

        self.conn
            .execute(
                "INSERT INTO projects (id, name, description, is_public, user_id, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    project.id.to_string(),
                    project.name.as_str(),
                    project.description.as_deref(),
                    bool_to_int(project.is_public),
                    project.user_id.to_string(),
                    owner_id.to_string(),
                ],
            )
            .map_err(|err| RepoError::from_write(err, "project", project.name.as_str()))?;
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        self.conn
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE p.id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_project_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_by_owner_and_name(
        &self,
        owner_name: &str,
        name: &str,
    ) -> RepoResult<Option<Project>> {
        self.conn
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE o.name = ?1 AND p.name = ?2;"),
                [owner_name, name],
                |row| Ok(parse_project_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE projects
                     SET name = ?2,
                         description = ?3,
                         is_public = ?4,
                         updated_at = {NOW_MS_SQL}
                     WHERE id = ?1;"
                ),
                params![
                    project.id.to_string(),
                    project.name.as_str(),
                    project.description.as_deref(),
                    bool_to_int(project.is_public),
                ],
            )
            .map_err(|err| RepoError::from_write(err, "project", project.name.as_str()))?;

        if changed == 0 {
            return Err(RepoError::not_found("project", project.id));
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        Ok(())
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<ProjectRows> {
        let mut filter = String::from(" WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner_name) = query.owner_name.as_ref() {
            filter.push_str(" AND o.name = ?");
            bind_values.push(Value::Text(owner_name.clone()));
        }

        match query.visibility {
            ProjectVisibility::All => {}
            ProjectVisibility::PublicOnly => filter.push_str(" AND p.is_public = 1"),
            ProjectVisibility::PublicOrOwnedBy(user_id) => {
                filter.push_str(
                    " AND (
                        p.is_public = 1
                        OR p.user_id = ?
                        OR (o.target_kind = 'user' AND o.target_id = ?)
                    )",
                );
                bind_values.push(Value::Text(user_id.to_string()));
                bind_values.push(Value::Text(user_id.to_string()));
            }
        }

        let total: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM projects p INNER JOIN owners o ON o.id = p.owner_id{filter};"
            ),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{PROJECT_SELECT_SQL}{filter} ORDER BY p.updated_at DESC, p.id ASC LIMIT ? OFFSET ?;"
        );
        bind_values.push(Value::Integer(i64::from(query.limit)));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_project_row(row)?);
        }

        Ok(ProjectRows {
            items,
            total: u64::try_from(total).map_err(|_| {
                RepoError::InvalidData(format!("negative project count `{total}`"))
            })?,
        })
    }

    fn add_bookmark(&self, user_id: UserId, project_id: ProjectId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT INTO project_bookmarks (user_id, project_id)
                 VALUES (?1, ?2)
                 ON CONFLICT(user_id, project_id) DO NOTHING;",
                params![user_id.to_string(), project_id.to_string()],
            )
            .map_err(|err| RepoError::from_write(err, "bookmark", &project_id.to_string()))?;
        Ok(changed > 0)
    }

    fn remove_bookmark(&self, user_id: UserId, project_id: ProjectId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM project_bookmarks WHERE user_id = ?1 AND project_id = ?2;",
            params![user_id.to_string(), project_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn bookmarked_among(
        &self,
        user_id: UserId,
        project_ids: &[ProjectId],
    ) -> RepoResult<BTreeSet<ProjectId>> {
        if project_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let placeholders = vec!["?"; project_ids.len()].join(", ");
        let sql = format!(
            "SELECT project_id FROM project_bookmarks
             WHERE user_id = ? AND project_id IN ({placeholders});"
        );
        let mut bind_values = vec![Value::Text(user_id.to_string())];
        bind_values.extend(project_ids.iter().map(|id| Value::Text(id.to_string())));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut bookmarked = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            bookmarked.insert(parse_id(&id, "project_bookmarks.project_id")?);
        }
        Ok(bookmarked)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let owner_id: String = row.get("owner_id")?;

    Ok(Project {
        id: parse_id(&id, "projects.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_public: parse_bool(row.get("is_public")?, "projects.is_public")?,
        user_id: parse_id(&user_id, "projects.user_id")?,
        owner_id: Some(parse_id(&owner_id, "projects.owner_id")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
