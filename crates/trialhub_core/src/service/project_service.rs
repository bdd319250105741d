//! Project lifecycle coordination.
//!
//! # Responsibility
//! - Project CRUD with owner-based authorization.
//! - Visibility-filtered, paginated listings flagged with the caller's
//!   bookmarks.
//! - Cascade deletion: stop active dependents, clean artifacts, then
//!   remove the project row and let the store cascade its dependents.
//!
//! # Invariants
//! - Missing projects are `NotFound` regardless of the actor.
//! - Private projects are readable by their owner only; every mutation
//!   requires ownership.
//! - Delete dispatches exactly one stop command per active dependent and
//!   none for dependents in any other state.

use crate::config::PaginationConfig;
use crate::model::account::Actor;
use crate::model::ids::ProjectId;
use crate::model::lifecycle::DependentKind;
use crate::model::owner::{Owner, OwnerTarget};
use crate::model::project::{
    BookmarkedProject, CreateProjectRequest, Project, ProjectDetail, ProjectPatch,
};
use crate::model::validation::{validate_slug_name, ValidationError};
use crate::outbound::artifacts::{ArtifactCleaner, ArtifactError};
use crate::outbound::auditor::{AuditEvent, AuditEventType, AuditTarget, Auditor};
use crate::outbound::dispatcher::{StopCommand, StopDispatcher};
use crate::repo::dependent_repo::DependentRepository;
use crate::repo::owner_repo::OwnerRepository;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository, ProjectVisibility};
use crate::repo::RepoError;
use crate::service::ownership_service::{OwnershipError, OwnershipService};
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ProjectResult<T> = Result<T, ProjectError>;

/// API-boundary classification of a project error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorClass {
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

#[derive(Debug)]
pub enum ProjectError {
    NotFound { owner: String, name: String },
    OwnerNotFound(String),
    /// Private project requested without an actor.
    Unauthenticated,
    Forbidden,
    Validation(ValidationError),
    Ownership(OwnershipError),
    Artifacts(ArtifactError),
    Repo(RepoError),
}

impl ProjectError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } | Self::OwnerNotFound(_) => ErrorClass::NotFound,
            Self::Unauthenticated => ErrorClass::Unauthorized,
            Self::Forbidden => ErrorClass::Forbidden,
            Self::Validation(_) | Self::Ownership(_) => ErrorClass::BadRequest,
            Self::Artifacts(_) | Self::Repo(_) => ErrorClass::Internal,
        }
    }
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { owner, name } => write!(f, "project not found: {owner}/{name}"),
            Self::OwnerNotFound(name) => write!(f, "owner not found: {name}"),
            Self::Unauthenticated => f.write_str("authentication credentials were not provided"),
            Self::Forbidden => f.write_str("you do not have permission to perform this action"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Ownership(err) => write!(f, "{err}"),
            Self::Artifacts(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Ownership(err) => Some(err),
            Self::Artifacts(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for ProjectError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<OwnershipError> for ProjectError {
    fn from(value: OwnershipError) -> Self {
        match value {
            OwnershipError::Repo(err) => Self::Repo(err),
            OwnershipError::Validation(err) => Self::Validation(err),
            other => Self::Ownership(other),
        }
    }
}

impl From<ArtifactError> for ProjectError {
    fn from(value: ArtifactError) -> Self {
        Self::Artifacts(value)
    }
}

/// Pagination input; `limit = None` uses the configured default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPage {
    pub items: Vec<BookmarkedProject>,
    /// Total matching rows across all pages.
    pub count: u64,
    pub next_offset: Option<u32>,
}

/// Outcome of a cascade delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub project_id: ProjectId,
    /// Stop commands issued per kind.
    pub stops: BTreeMap<DependentKind, u64>,
    /// Stop commands the dispatcher refused.
    pub dispatch_failures: u64,
    /// Dependents whose artifacts were cleaned, in any state.
    pub cleaned_dependents: u64,
}

impl DeleteReport {
    pub fn stops_for(&self, kind: DependentKind) -> u64 {
        self.stops.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_stops(&self) -> u64 {
        self.stops.values().sum()
    }
}

/// External collaborators used during project operations.
#[derive(Clone, Copy)]
pub struct ProjectCollaborators<'a> {
    pub dispatcher: &'a dyn StopDispatcher,
    pub auditor: &'a Auditor,
    pub artifacts: &'a dyn ArtifactCleaner,
}

pub struct ProjectService<'a, P, D, O>
where
    P: ProjectRepository,
    D: DependentRepository,
    O: OwnerRepository,
{
    projects: P,
    dependents: D,
    ownership: OwnershipService<O>,
    collaborators: ProjectCollaborators<'a>,
    pagination: PaginationConfig,
}

impl<'a, P, D, O> ProjectService<'a, P, D, O>
where
    P: ProjectRepository,
    D: DependentRepository,
    O: OwnerRepository,
{
    pub fn new(
        projects: P,
        dependents: D,
        ownership: OwnershipService<O>,
        collaborators: ProjectCollaborators<'a>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            projects,
            dependents,
            ownership,
            collaborators,
            pagination,
        }
    }

    pub fn ownership(&self) -> &OwnershipService<O> {
        &self.ownership
    }

    /// Projects owned by `username`.
    ///
    /// The owner sees everything; other actors see public projects plus
    /// projects they created; anonymous callers see public projects only.
    pub fn list_user_projects(
        &self,
        actor: Option<&Actor>,
        username: &str,
        page: PageRequest,
    ) -> ProjectResult<ProjectPage> {
        let owner = self
            .ownership
            .owner_by_name(username)?
            .ok_or_else(|| ProjectError::OwnerNotFound(username.to_string()))?;

        let visibility = match actor {
            Some(actor) if owner.target == OwnerTarget::User(actor.user_id) => {
                ProjectVisibility::All
            }
            Some(actor) => ProjectVisibility::PublicOrOwnedBy(actor.user_id),
            None => ProjectVisibility::PublicOnly,
        };
        self.list_page(actor, Some(owner.name), visibility, page)
    }

    /// The actor's own projects plus every public project.
    pub fn list_visible_projects(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> ProjectResult<ProjectPage> {
        self.list_page(
            Some(actor),
            None,
            ProjectVisibility::PublicOrOwnedBy(actor.user_id),
            page,
        )
    }

    /// Project detail with per-kind dependent counts.
    pub fn get_project(
        &self,
        actor: Option<&Actor>,
        username: &str,
        name: &str,
    ) -> ProjectResult<ProjectDetail> {
        let (project, owner) = self.load(username, name)?;
        authorize_read(actor, &project, &owner)?;

        let mut dependent_counts = BTreeMap::new();
        for kind in DependentKind::ALL {
            dependent_counts.insert(kind, self.dependents.count_for_project(project.id, kind)?);
        }

        if let Some(actor) = actor {
            self.audit(AuditEventType::ProjectViewed, &project, Some(actor));
        }
        Ok(ProjectDetail {
            project,
            owner,
            dependent_counts,
        })
    }

    /// Creates a project owned by the actor's user owner.
    pub fn create_project(
        &self,
        actor: &Actor,
        request: &CreateProjectRequest,
    ) -> ProjectResult<Project> {
        let name = validate_slug_name("name", request.name.as_deref())?;
        let mut project = Project::draft(name, actor.user_id);
        project.description = normalize_description(request.description.as_deref());
        project.is_public = request.is_public.unwrap_or(true);

        self.ownership.set_default_owner(&mut project, actor)?;

        self.projects
            .create_project(&project)
            .map_err(|err| name_taken(err, &project.name))?;
        let project = self.reload(project.id)?;

        info!("event=project_create module=projects status=ok");
        self.audit(AuditEventType::ProjectCreated, &project, Some(actor));
        Ok(project)
    }

    /// Applies `patch` to a project the actor owns.
    pub fn update_project(
        &self,
        actor: &Actor,
        username: &str,
        name: &str,
        patch: &ProjectPatch,
    ) -> ProjectResult<Project> {
        let (mut project, owner) = self.load(username, name)?;
        authorize_write(actor, &project, &owner)?;

        if let Some(new_name) = patch.name.as_deref() {
            project.name = validate_slug_name("name", Some(new_name))?;
        }
        if let Some(description) = patch.description.as_deref() {
            project.description = normalize_description(Some(description));
        }
        if let Some(is_public) = patch.is_public {
            project.is_public = is_public;
        }

        if !patch.is_empty() {
            self.projects
                .update_project(&project)
                .map_err(|err| name_taken(err, &project.name))?;
        }
        let project = self.reload(project.id)?;

        info!("event=project_update module=projects status=ok");
        self.audit(AuditEventType::ProjectUpdated, &project, Some(actor));
        Ok(project)
    }

    /// Bookmarks a project the actor can read.
    ///
    /// Returns `false` when it was already bookmarked; the event is
    /// recorded either way.
    pub fn bookmark_project(
        &self,
        actor: &Actor,
        username: &str,
        name: &str,
    ) -> ProjectResult<bool> {
        let (project, owner) = self.load(username, name)?;
        authorize_read(Some(actor), &project, &owner)?;

        let added = self.projects.add_bookmark(actor.user_id, project.id)?;
        info!("event=project_bookmark module=projects status=ok added={added}");
        self.audit(AuditEventType::ProjectBookmarked, &project, Some(actor));
        Ok(added)
    }

    /// Removes the actor's bookmark; returns `false` when there was none.
    pub fn unbookmark_project(
        &self,
        actor: &Actor,
        username: &str,
        name: &str,
    ) -> ProjectResult<bool> {
        let (project, owner) = self.load(username, name)?;
        authorize_read(Some(actor), &project, &owner)?;

        let removed = self.projects.remove_bookmark(actor.user_id, project.id)?;
        info!("event=project_unbookmark module=projects status=ok removed={removed}");
        self.audit(AuditEventType::ProjectUnbookmarked, &project, Some(actor));
        Ok(removed)
    }

    /// Stops active dependents, cleans artifacts and deletes the project.
    ///
    /// # Contract
    /// - One stop command per dependent in an active state, in
    ///   `DependentKind::ALL` order; dispatch failures are logged only.
    /// - Artifact cleanup runs once for the project and once per
    ///   dependent; a cleanup failure aborts before the row is deleted.
    /// - Dependents are removed by the store cascade with the project row.
    pub fn delete_project(
        &self,
        actor: &Actor,
        username: &str,
        name: &str,
    ) -> ProjectResult<DeleteReport> {
        let (project, owner) = self.load(username, name)?;
        authorize_write(actor, &project, &owner)?;

        let mut stops = BTreeMap::new();
        let mut dispatch_failures = 0;
        for kind in DependentKind::ALL {
            let active = self.dependents.list_active(project.id, kind)?;
            for dependent in &active {
                let command = StopCommand {
                    kind,
                    dependent_id: dependent.id,
                    project_id: project.id,
                    actor: Some(actor.clone()),
                };
                if let Err(err) = self.collaborators.dispatcher.dispatch(command) {
                    dispatch_failures += 1;
                    warn!(
                        "event=project_delete module=projects status=dispatch_error \
                         kind={} error={}",
                        kind, err
                    );
                }
                self.collaborators.auditor.record(AuditEvent::new(
                    AuditEventType::StoppedTriggered(kind),
                    AuditTarget::new(kind.content_type(), dependent.id),
                    Some(actor),
                ));
            }
            stops.insert(kind, active.len() as u64);
        }

        let cleaned_dependents = self.clean_artifacts(&project)?;

        self.projects.delete_project(project.id)?;
        info!(
            "event=project_delete module=projects status=ok \
             stops={} dispatch_failures={} cleaned={}",
            stops.values().sum::<u64>(),
            dispatch_failures,
            cleaned_dependents
        );
        self.audit(AuditEventType::ProjectDeletedTriggered, &project, Some(actor));
        self.audit(AuditEventType::ProjectDeleted, &project, None);

        Ok(DeleteReport {
            project_id: project.id,
            stops,
            dispatch_failures,
            cleaned_dependents,
        })
    }

    fn clean_artifacts(&self, project: &Project) -> ProjectResult<u64> {
        let artifacts = self.collaborators.artifacts;
        if let Err(err) = artifacts.delete_project_artifacts(project) {
            error!(
                "event=project_delete module=projects status=error \
                 error_code=artifacts_failed error={}",
                err
            );
            return Err(err.into());
        }

        let mut cleaned = 0;
        for kind in DependentKind::ALL {
            for dependent in self.dependents.list_for_project(project.id, kind, None)? {
                if let Err(err) = artifacts.delete_dependent_artifacts(&dependent) {
                    error!(
                        "event=project_delete module=projects status=error \
                         error_code=artifacts_failed kind={} error={}",
                        kind, err
                    );
                    return Err(err.into());
                }
                cleaned += 1;
            }
        }
        Ok(cleaned)
    }

    fn list_page(
        &self,
        actor: Option<&Actor>,
        owner_name: Option<String>,
        visibility: ProjectVisibility,
        page: PageRequest,
    ) -> ProjectResult<ProjectPage> {
        let limit = self.pagination.normalize_limit(page.limit);
        let rows = self.projects.list_projects(&ProjectListQuery {
            owner_name,
            visibility,
            limit,
            offset: page.offset,
        })?;

        let seen = u64::from(page.offset) + rows.items.len() as u64;
        let next_offset = if seen < rows.total {
            u32::try_from(seen).ok()
        } else {
            None
        };
        let bookmarked = match actor {
            Some(actor) => {
                let ids: Vec<ProjectId> = rows.items.iter().map(|project| project.id).collect();
                self.projects.bookmarked_among(actor.user_id, &ids)?
            }
            None => BTreeSet::new(),
        };
        let items = rows
            .items
            .into_iter()
            .map(|project| BookmarkedProject {
                bookmarked: bookmarked.contains(&project.id),
                project,
            })
            .collect();

        Ok(ProjectPage {
            items,
            count: rows.total,
            next_offset,
        })
    }

    fn load(&self, username: &str, name: &str) -> ProjectResult<(Project, Owner)> {
        let project = self
            .projects
            .find_by_owner_and_name(username, name)?
            .ok_or_else(|| ProjectError::NotFound {
                owner: username.to_string(),
                name: name.to_string(),
            })?;
        let owner_id = project.owner_id.ok_or_else(|| {
            RepoError::InvalidData(format!("project {} has no owner", project.id))
        })?;
        let owner = self
            .ownership
            .owner_by_id(owner_id)?
            .ok_or_else(|| RepoError::not_found("owner", owner_id))?;
        Ok((project, owner))
    }

    fn reload(&self, id: ProjectId) -> ProjectResult<Project> {
        Ok(self
            .projects
            .get_project(id)?
            .ok_or_else(|| RepoError::not_found("project", id))?)
    }

    fn audit(&self, event_type: AuditEventType, project: &Project, actor: Option<&Actor>) {
        self.collaborators.auditor.record(AuditEvent::new(
            event_type,
            AuditTarget::new("project", project.id),
            actor,
        ));
    }
}

/// User-owned projects belong to that user; team and organization
/// projects belong to the user who created them.
fn is_owned_by(actor: &Actor, project: &Project, owner: &Owner) -> bool {
    match owner.target {
        OwnerTarget::User(user_id) => user_id == actor.user_id,
        OwnerTarget::Team(_) | OwnerTarget::Organization(_) => project.user_id == actor.user_id,
    }
}

fn authorize_read(actor: Option<&Actor>, project: &Project, owner: &Owner) -> ProjectResult<()> {
    if project.is_public {
        return Ok(());
    }
    match actor {
        None => Err(ProjectError::Unauthenticated),
        Some(actor) if is_owned_by(actor, project, owner) => Ok(()),
        Some(_) => Err(ProjectError::Forbidden),
    }
}

fn authorize_write(actor: &Actor, project: &Project, owner: &Owner) -> ProjectResult<()> {
    if is_owned_by(actor, project, owner) {
        Ok(())
    } else {
        Err(ProjectError::Forbidden)
    }
}

fn normalize_description(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn name_taken(err: RepoError, name: &str) -> ProjectError {
    match err {
        RepoError::Conflict { .. } => ValidationError::NameTaken(name.to_string()).into(),
        other => other.into(),
    }
}
