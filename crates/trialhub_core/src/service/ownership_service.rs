//! Ownership resolution service.
//!
//! # Responsibility
//! - Resolve an owner from an explicit record, a name, or a target account.
//! - Enforce the configured owner-kind allow-list before binding an owner.
//! - Create, delete and validate owner names.
//!
//! # Invariants
//! - An entity is only bound to an owner whose kind is allowed.
//! - `delete_owner` is idempotent for unknown names.

use crate::config::OwnershipConfig;
use crate::model::account::Actor;
use crate::model::ids::OwnerId;
use crate::model::owner::{Ownable, Owner, OwnerKind, OwnerTarget};
use crate::model::validation::{validate_slug_name, ValidationError};
use crate::repo::owner_repo::OwnerRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OwnershipResult<T> = Result<T, OwnershipError>;

/// Exactly one way of naming the owner to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerSource {
    Owner(Owner),
    Name(String),
    Target(OwnerTarget),
}

#[derive(Debug)]
pub enum OwnershipError {
    /// Name or target lookup found no owner.
    OwnerNotFound,
    OwnerKindNotAllowed(OwnerKind),
    /// User-owned entities are disabled or the actor has no owner.
    UserOwnedEntitiesDisabled,
    TargetAlreadyOwned(OwnerTarget),
    /// Owner is still referenced by at least one entity.
    OwnerInUse(String),
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for OwnershipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OwnerNotFound => f.write_str("could not set an owner, owner not found"),
            Self::OwnerKindNotAllowed(kind) => {
                write!(f, "received an invalid owner type `{kind}`")
            }
            Self::UserOwnedEntitiesDisabled => f.write_str(
                "you are not allowed to create a project, please contact your admin",
            ),
            Self::TargetAlreadyOwned(target) => write!(f, "{target} already has an owner"),
            Self::OwnerInUse(name) => write!(f, "owner `{name}` still owns entities"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OwnershipError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for OwnershipError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for OwnershipError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Owner binding and bookkeeping over an owner repository.
pub struct OwnershipService<R: OwnerRepository> {
    repo: R,
    config: OwnershipConfig,
}

impl<R: OwnerRepository> OwnershipService<R> {
    pub fn new(repo: R, config: OwnershipConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &OwnershipConfig {
        &self.config
    }

    /// Resolves `source` and binds the owner to `entity`.
    ///
    /// # Contract
    /// - Unknown name or target: `OwnerNotFound`.
    /// - Kind outside the allow-list: `OwnerKindNotAllowed`, for all sources.
    /// - `commit = true` persists the owner pointer; otherwise only the
    ///   in-memory entity changes.
    pub fn set_owner<E: Ownable>(
        &self,
        entity: &mut E,
        source: OwnerSource,
        commit: bool,
    ) -> OwnershipResult<Owner> {
        let owner = match source {
            OwnerSource::Owner(owner) => owner,
            OwnerSource::Name(name) => self
                .repo
                .find_by_name(&name)?
                .ok_or(OwnershipError::OwnerNotFound)?,
            OwnerSource::Target(target) => self
                .repo
                .find_by_target(target)?
                .ok_or(OwnershipError::OwnerNotFound)?,
        };

        if !self.config.allows(owner.kind()) {
            return Err(OwnershipError::OwnerKindNotAllowed(owner.kind()));
        }

        if commit {
            self.repo.assign_owner(entity.ownable_ref(), owner.id)?;
        }
        entity.assign_owner(&owner);
        Ok(owner)
    }

    /// Binds the actor's own user owner to a not-yet-persisted entity.
    pub fn set_default_owner<E: Ownable>(
        &self,
        entity: &mut E,
        actor: &Actor,
    ) -> OwnershipResult<Owner> {
        if !self.config.allow_user_projects {
            return Err(OwnershipError::UserOwnedEntitiesDisabled);
        }

        let source = OwnerSource::Target(OwnerTarget::User(actor.user_id));
        match self.set_owner(entity, source, false) {
            Ok(owner) => Ok(owner),
            Err(OwnershipError::Repo(err)) => Err(OwnershipError::Repo(err)),
            Err(err) => {
                warn!(
                    "event=owner_default module=ownership status=error error={}",
                    err
                );
                Err(OwnershipError::UserOwnedEntitiesDisabled)
            }
        }
    }

    /// Inserts an owner for `target` under `name`.
    pub fn create_owner(&self, target: OwnerTarget, name: &str) -> OwnershipResult<Owner> {
        let name = validate_slug_name("name", Some(name))?;
        let owner = Owner::new(name, target);

        match self.repo.create_owner(&owner) {
            Ok(()) => {
                info!(
                    "event=owner_create module=ownership status=ok kind={}",
                    owner.kind()
                );
                Ok(owner)
            }
            Err(RepoError::Conflict { .. }) => {
                if self.repo.name_exists(&owner.name)? {
                    Err(ValidationError::NameTaken(owner.name).into())
                } else {
                    Err(OwnershipError::TargetAlreadyOwned(target))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the owner named `name`; unknown names are ignored.
    pub fn delete_owner(&self, name: &str) -> OwnershipResult<()> {
        match self.repo.delete_by_name(name) {
            Ok(true) => {
                info!("event=owner_delete module=ownership status=ok");
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(RepoError::ForeignKey { .. }) => {
                Err(OwnershipError::OwnerInUse(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fails with `NameTaken` when an owner already uses `name`.
    pub fn validate_owner_name(&self, name: &str) -> OwnershipResult<()> {
        if self.repo.name_exists(name)? {
            return Err(ValidationError::NameTaken(name.to_string()).into());
        }
        Ok(())
    }

    pub fn owner_by_id(&self, id: OwnerId) -> OwnershipResult<Option<Owner>> {
        Ok(self.repo.get_owner(id)?)
    }

    pub fn owner_by_name(&self, name: &str) -> OwnershipResult<Option<Owner>> {
        Ok(self.repo.find_by_name(name)?)
    }

    pub fn owner_by_target(&self, target: OwnerTarget) -> OwnershipResult<Option<Owner>> {
        Ok(self.repo.find_by_target(target)?)
    }
}
