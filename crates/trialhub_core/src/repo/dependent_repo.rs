//! Dependent repository: experiment groups, experiments, jobs, build jobs
//! and plugin jobs, all scoped to one project.
//!
//! # Invariants
//! - Every dependent row references an existing project.
//! - Only experiments carry `experiment_group_id`.
//! - Lists are ordered `created_at ASC, id ASC`.

use crate::model::ids::{DependentId, ProjectId};
use crate::model::lifecycle::{Dependent, DependentKind, LifecycleState};
use crate::repo::{ensure_schema_ready, parse_id, RepoError, RepoResult, NOW_MS_SQL};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const DEPENDENT_COLUMNS: &[&str] = &[
    "id",
    "project_id",
    "name",
    "state",
    "created_at",
    "updated_at",
];
const EXPERIMENT_COLUMNS: &[&str] = &[
    "id",
    "project_id",
    "experiment_group_id",
    "name",
    "state",
    "created_at",
    "updated_at",
];

pub trait DependentRepository {
    fn create_dependent(&self, dependent: &Dependent) -> RepoResult<()>;
    fn get_dependent(&self, kind: DependentKind, id: DependentId) -> RepoResult<Option<Dependent>>;
    fn set_state(&self, kind: DependentKind, id: DependentId, state: LifecycleState)
        -> RepoResult<()>;
    /// Lists dependents of one kind, optionally restricted to `states`.
    fn list_for_project(
        &self,
        project_id: ProjectId,
        kind: DependentKind,
        states: Option<&[LifecycleState]>,
    ) -> RepoResult<Vec<Dependent>>;
    fn count_for_project(&self, project_id: ProjectId, kind: DependentKind) -> RepoResult<u64>;

    /// Dependents of one kind currently in an active state.
    fn list_active(
        &self,
        project_id: ProjectId,
        kind: DependentKind,
    ) -> RepoResult<Vec<Dependent>> {
        self.list_for_project(project_id, kind, Some(LifecycleState::ACTIVE.as_slice()))
    }
}

pub struct SqliteDependentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDependentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let required: Vec<(&'static str, &'static [&'static str])> = DependentKind::ALL
            .iter()
            .map(|kind| (kind.table(), columns_for(*kind)))
            .collect();
        ensure_schema_ready(conn, &required)?;
        Ok(Self { conn })
    }
}

impl DependentRepository for SqliteDependentRepository<'_> {
    fn create_dependent(&self, dependent: &Dependent) -> RepoResult<()> {
        let id = dependent.id.to_string();
        let entity = dependent.kind.content_type();
        let result = if dependent.kind == DependentKind::Experiment {
            self.conn.execute(
                "INSERT INTO experiments (id, project_id, experiment_group_id, name, state)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    id.as_str(),
                    dependent.project_id.to_string(),
                    dependent.experiment_group_id.map(|group| group.to_string()),
                    dependent.name.as_str(),
                    dependent.state.as_str(),
                ],
            )
        } else {
            if dependent.experiment_group_id.is_some() {
                return Err(RepoError::InvalidData(format!(
                    "{entity} {id} cannot belong to an experiment group"
                )));
            }
            self.conn.execute(
                &format!(
                    "INSERT INTO {} (id, project_id, name, state) VALUES (?1, ?2, ?3, ?4);",
                    dependent.kind.table()
                ),
                params![
                    id.as_str(),
                    dependent.project_id.to_string(),
                    dependent.name.as_str(),
                    dependent.state.as_str(),
                ],
            )
        };

        result.map_err(|err| RepoError::from_write(err, entity, id.as_str()))?;
        Ok(())
    }

    fn get_dependent(&self, kind: DependentKind, id: DependentId) -> RepoResult<Option<Dependent>> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?1;", select_sql(kind)),
                [id.to_string()],
                |row| Ok(parse_dependent_row(kind, row)),
            )
            .optional()?
            .transpose()
    }

    fn set_state(
        &self,
        kind: DependentKind,
        id: DependentId,
        state: LifecycleState,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {}
                 SET state = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;",
                kind.table()
            ),
            params![id.to_string(), state.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(kind.content_type(), id));
        }
        Ok(())
    }

    fn list_for_project(
        &self,
        project_id: ProjectId,
        kind: DependentKind,
        states: Option<&[LifecycleState]>,
    ) -> RepoResult<Vec<Dependent>> {
        let mut sql = format!("{} WHERE project_id = ?", select_sql(kind));
        let mut bind_values = vec![Value::Text(project_id.to_string())];

        if let Some(states) = states {
            if states.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; states.len()].join(", ");
            sql.push_str(&format!(" AND state IN ({placeholders})"));
            bind_values.extend(
                states
                    .iter()
                    .map(|state| Value::Text(state.as_str().to_string())),
            );
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_dependent_row(kind, row)?);
        }
        Ok(items)
    }

    fn count_for_project(&self, project_id: ProjectId, kind: DependentKind) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE project_id = ?1;", kind.table()),
            [project_id.to_string()],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative {kind} count `{count}`")))
    }
}

fn columns_for(kind: DependentKind) -> &'static [&'static str] {
    if kind == DependentKind::Experiment {
        EXPERIMENT_COLUMNS
    } else {
        DEPENDENT_COLUMNS
    }
}

fn select_sql(kind: DependentKind) -> String {
    let group_column = if kind == DependentKind::Experiment {
        "experiment_group_id"
    } else {
        "NULL AS experiment_group_id"
    };
    format!(
        "SELECT id, project_id, {group_column}, name, state, created_at, updated_at FROM {}",
        kind.table()
    )
}

fn parse_dependent_row(kind: DependentKind, row: &Row<'_>) -> RepoResult<Dependent> {
    let table = kind.table();
    let id: String = row.get("id")?;
    let project_id: String = row.get("project_id")?;
    let state_text: String = row.get("state")?;
    let state = LifecycleState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid state `{state_text}` in {table}.state"))
    })?;

    Ok(Dependent {
        id: parse_id(&id, "dependent.id")?,
        kind,
        project_id: parse_id(&project_id, "dependent.project_id")?,
        experiment_group_id: row
            .get::<_, Option<String>>("experiment_group_id")?
            .map(|value| parse_id(&value, "experiments.experiment_group_id"))
            .transpose()?,
        name: row.get("name")?,
        state,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
