//! Account repository: users, organizations and teams.
//!
//! # Invariants
//! - An account row and its owner row are inserted in one transaction;
//!   either both exist or neither does.

use crate::model::account::{Organization, Team, User};
use crate::model::ids::{OrganizationId, TeamId, UserId};
use crate::model::owner::Owner;
use crate::repo::{ensure_schema_ready, parse_id, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

const USER_COLUMNS: &[&str] = &["id", "username", "email"];
const ORGANIZATION_COLUMNS: &[&str] = &["id", "name"];
const TEAM_COLUMNS: &[&str] = &["id", "name", "organization_id"];
const OWNER_COLUMNS: &[&str] = &["id", "name", "target_kind", "target_id"];

pub trait AccountRepository {
    /// Inserts the user and its owner atomically.
    fn create_user_with_owner(&self, user: &User, owner: &Owner) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn create_organization_with_owner(
        &self,
        organization: &Organization,
        owner: &Owner,
    ) -> RepoResult<()>;
    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>>;
    fn create_team_with_owner(&self, team: &Team, owner: &Owner) -> RepoResult<()>;
    fn get_team(&self, id: TeamId) -> RepoResult<Option<Team>>;
}

pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(
            conn,
            &[
                ("users", USER_COLUMNS),
                ("organizations", ORGANIZATION_COLUMNS),
                ("teams", TEAM_COLUMNS),
                ("owners", OWNER_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }

    fn with_owner_tx(
        &self,
        owner: &Owner,
        insert_account: impl FnOnce(&Transaction<'_>) -> RepoResult<()>,
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_account(&tx)?;
        tx.execute(
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
        tx.commit()?;
        Ok(())
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_user_with_owner(&self, user: &User, owner: &Owner) -> RepoResult<()> {
        self.with_owner_tx(owner, |tx| {
            tx.execute(
                "INSERT INTO users (id, username, email) VALUES (?1, ?2, ?3);",
                params![user.id.to_string(), user.username.as_str(), user.email.as_deref()],
            )
            .map_err(|err| RepoError::from_write(err, "user", user.username.as_str()))?;
            Ok(())
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.query_user("SELECT id, username, email FROM users WHERE id = ?1;", &id.to_string())
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.query_user(
            "SELECT id, username, email FROM users WHERE username = ?1;",
            username,
        )
    }

    fn create_organization_with_owner(
        &self,
        organization: &Organization,
        owner: &Owner,
    ) -> RepoResult<()> {
        self.with_owner_tx(owner, |tx| {
            tx.execute(
                "INSERT INTO organizations (id, name) VALUES (?1, ?2);",
                params![organization.id.to_string(), organization.name.as_str()],
            )
            .map_err(|err| RepoError::from_write(err, "organization", organization.name.as_str()))?;
            Ok(())
        })
    }

    fn get_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name FROM organizations WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(id, name)| {
            Ok(Organization {
                id: parse_id(&id, "organizations.id")?,
                name,
            })
        })
        .transpose()
    }

    fn create_team_with_owner(&self, team: &Team, owner: &Owner) -> RepoResult<()> {
        self.with_owner_tx(owner, |tx| {
            tx.execute(
                "INSERT INTO teams (id, name, organization_id) VALUES (?1, ?2, ?3);",
                params![
                    team.id.to_string(),
                    team.name.as_str(),
                    team.organization_id.map(|id| id.to_string()),
                ],
            )
            .map_err(|err| RepoError::from_write(err, "team", team.name.as_str()))?;
            Ok(())
        })
    }

    fn get_team(&self, id: TeamId) -> RepoResult<Option<Team>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, organization_id FROM teams WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, name, organization_id)| {
            Ok(Team {
                id: parse_id(&id, "teams.id")?,
                name,
                organization_id: organization_id
                    .map(|value| parse_id(&value, "teams.organization_id"))
                    .transpose()?,
            })
        })
        .transpose()
    }
}

impl SqliteAccountRepository<'_> {
    fn query_user(&self, sql: &str, key: &str) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(sql, [key], |row| {
                Ok((
                    row.get::<_, String>("id")?,
                    row.get::<_, String>("username")?,
                    row.get::<_, Option<String>>("email")?,
                ))
            })
            .optional()?;

        row.map(|(id, username, email)| {
            Ok(User {
                id: parse_id(&id, "users.id")?,
                username,
                email,
            })
        })
        .transpose()
    }
}
