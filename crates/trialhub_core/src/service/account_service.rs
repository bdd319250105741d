//! Account registration: every account is created together with its owner.

use crate::model::account::{Organization, Team, User};
use crate::model::ids::{OrganizationId, TeamId, UserId};
use crate::model::owner::{Owner, OwnerTarget};
use crate::model::validation::{validate_slug_name, ValidationError};
use crate::repo::account_repo::AccountRepository;
use crate::repo::RepoError;
use crate::service::ownership_service::OwnershipError;
use log::info;

/// Account use-case service.
pub struct AccountService<R: AccountRepository> {
    repo: R,
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a user and its user owner named after `username`.
    pub fn register_user(
        &self,
        username: &str,
        email: Option<&str>,
    ) -> Result<User, OwnershipError> {
        let username = validate_slug_name("username", Some(username))?;
        let user = User {
            id: UserId::new(),
            username,
            email: email
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        };
        let owner = Owner::new(user.username.clone(), user.owner_target());

        self.repo
            .create_user_with_owner(&user, &owner)
            .map_err(|err| name_conflict(err, &user.username))?;
        info!("event=account_register module=accounts status=ok kind=user");
        Ok(user)
    }

    pub fn create_organization(&self, name: &str) -> Result<Organization, OwnershipError> {
        let name = validate_slug_name("name", Some(name))?;
        let organization = Organization {
            id: OrganizationId::new(),
            name,
        };
        let owner = Owner::new(
            organization.name.clone(),
            OwnerTarget::Organization(organization.id),
        );

        self.repo
            .create_organization_with_owner(&organization, &owner)
            .map_err(|err| name_conflict(err, &organization.name))?;
        info!("event=account_register module=accounts status=ok kind=organization");
        Ok(organization)
    }

    pub fn create_team(
        &self,
        name: &str,
        organization_id: Option<OrganizationId>,
    ) -> Result<Team, OwnershipError> {
        let name = validate_slug_name("name", Some(name))?;
        let team = Team {
            id: TeamId::new(),
            name,
            organization_id,
        };
        let owner = Owner::new(team.name.clone(), OwnerTarget::Team(team.id));

        self.repo
            .create_team_with_owner(&team, &owner)
            .map_err(|err| name_conflict(err, &team.name))?;
        info!("event=account_register module=accounts status=ok kind=team");
        Ok(team)
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        self.repo.get_user(id)
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.repo.find_user_by_username(username)
    }

    pub fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, RepoError> {
        self.repo.get_organization(id)
    }

    pub fn get_team(&self, id: TeamId) -> Result<Option<Team>, RepoError> {
        self.repo.get_team(id)
    }
}

/// Account and owner names share one namespace, so any unique collision
/// on either row means the name is taken.
fn name_conflict(err: RepoError, name: &str) -> OwnershipError {
    match err {
        RepoError::Conflict { .. } => ValidationError::NameTaken(name.to_string()).into(),
        other => other.into(),
    }
}
