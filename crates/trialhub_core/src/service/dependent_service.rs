//! Dependent records and their lifecycle transitions.
//!
//! # Invariants
//! - New dependents start in `Created`.
//! - State changes follow `LifecycleState::can_transition_to`.
//! - Only experiments join an experiment group, and only one from the
//!   same project.

use crate::model::ids::{DependentId, ProjectId};
use crate::model::lifecycle::{Dependent, DependentKind, LifecycleState};
use crate::model::validation::{validate_slug_name, ValidationError};
use crate::repo::dependent_repo::DependentRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug)]
pub enum LifecycleError {
    NotFound {
        kind: DependentKind,
        id: DependentId,
    },
    InvalidTransition {
        kind: DependentKind,
        from: LifecycleState,
        to: LifecycleState,
    },
    /// Only experiments may reference an experiment group.
    GroupNotAllowed(DependentKind),
    /// Group belongs to a different project.
    GroupProjectMismatch {
        group_id: DependentId,
        project_id: ProjectId,
    },
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidTransition { kind, from, to } => {
                write!(f, "{kind} cannot move from `{from}` to `{to}`")
            }
            Self::GroupNotAllowed(kind) => {
                write!(f, "{kind} cannot belong to an experiment group")
            }
            Self::GroupProjectMismatch {
                group_id,
                project_id,
            } => write!(
                f,
                "experiment group {group_id} does not belong to project {project_id}"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for LifecycleError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct DependentService<R: DependentRepository> {
    repo: R,
}

impl<R: DependentRepository> DependentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a dependent in `Created` state and returns the stored row.
    pub fn create_dependent(
        &self,
        project_id: ProjectId,
        kind: DependentKind,
        name: &str,
        group_id: Option<DependentId>,
    ) -> LifecycleResult<Dependent> {
        let name = validate_slug_name("name", Some(name))?;
        if let Some(group_id) = group_id {
            if kind != DependentKind::Experiment {
                return Err(LifecycleError::GroupNotAllowed(kind));
            }
            let group = self
                .repo
                .get_dependent(DependentKind::ExperimentGroup, group_id)?
                .ok_or(LifecycleError::NotFound {
                    kind: DependentKind::ExperimentGroup,
                    id: group_id,
                })?;
            if group.project_id != project_id {
                return Err(LifecycleError::GroupProjectMismatch {
                    group_id,
                    project_id,
                });
            }
        }

        let mut dependent = Dependent::new(kind, project_id, name);
        dependent.experiment_group_id = group_id;
        self.repo.create_dependent(&dependent)?;
        info!(
            "event=dependent_create module=lifecycle status=ok kind={}",
            kind
        );
        self.get(kind, dependent.id)
    }

    /// Moves a dependent to `next` when the transition table allows it.
    pub fn transition(
        &self,
        kind: DependentKind,
        id: DependentId,
        next: LifecycleState,
    ) -> LifecycleResult<Dependent> {
        let current = self.get(kind, id)?;
        if !current.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                kind,
                from: current.state,
                to: next,
            });
        }

        self.repo.set_state(kind, id, next)?;
        info!(
            "event=dependent_transition module=lifecycle status=ok kind={} from={} to={}",
            kind, current.state, next
        );
        self.get(kind, id)
    }

    pub fn get(&self, kind: DependentKind, id: DependentId) -> LifecycleResult<Dependent> {
        self.repo
            .get_dependent(kind, id)?
            .ok_or(LifecycleError::NotFound { kind, id })
    }

    pub fn list_for_project(
        &self,
        project_id: ProjectId,
        kind: DependentKind,
    ) -> LifecycleResult<Vec<Dependent>> {
        Ok(self.repo.list_for_project(project_id, kind, None)?)
    }

    pub fn count_for_project(
        &self,
        project_id: ProjectId,
        kind: DependentKind,
    ) -> LifecycleResult<u64> {
        Ok(self.repo.count_for_project(project_id, kind)?)
    }
}
