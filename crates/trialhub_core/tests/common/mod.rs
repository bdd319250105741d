#![allow(dead_code)]

use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use trialhub_core::repo::account_repo::SqliteAccountRepository;
use trialhub_core::repo::dependent_repo::SqliteDependentRepository;
use trialhub_core::repo::owner_repo::SqliteOwnerRepository;
use trialhub_core::repo::project_repo::SqliteProjectRepository;
use trialhub_core::{
    open_db_in_memory, AccountService, Actor, ArtifactCleaner, ArtifactError, AuditEvent, Auditor,
    ChannelStopDispatcher, ChannelSubscriber, CreateProjectRequest, Dependent, DependentId,
    DependentKind, DependentService, LifecycleState, OwnershipConfig, OwnershipService,
    PaginationConfig, Project, ProjectCollaborators, ProjectId, ProjectService, StopCommand,
    SubscriberScope,
};

pub type Service<'a> = ProjectService<
    'a,
    SqliteProjectRepository<'a>,
    SqliteDependentRepository<'a>,
    SqliteOwnerRepository<'a>,
>;

/// Artifact cleaner recording every call.
#[derive(Default)]
pub struct RecordingCleaner {
    pub projects: RefCell<Vec<ProjectId>>,
    pub dependents: RefCell<Vec<(DependentKind, DependentId)>>,
    pub fail_dependents: Cell<bool>,
}

impl ArtifactCleaner for RecordingCleaner {
    fn delete_project_artifacts(&self, project: &Project) -> Result<(), ArtifactError> {
        self.projects.borrow_mut().push(project.id);
        Ok(())
    }

    fn delete_dependent_artifacts(&self, dependent: &Dependent) -> Result<(), ArtifactError> {
        if self.fail_dependents.get() {
            return Err(ArtifactError::Io {
                path: PathBuf::from("/artifacts").join(dependent.id.to_string()),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        self.dependents.borrow_mut().push((dependent.kind, dependent.id));
        Ok(())
    }
}

pub struct Harness {
    pub conn: Connection,
    pub auditor: Auditor,
    pub dispatcher: ChannelStopDispatcher,
    pub stops: Receiver<StopCommand>,
    pub tracker: Receiver<AuditEvent>,
    pub activity: Receiver<AuditEvent>,
    pub artifacts: RecordingCleaner,
    pub ownership: OwnershipConfig,
    pub pagination: PaginationConfig,
}

impl Harness {
    pub fn new() -> Self {
        let (stop_tx, stops) = channel();
        let (tracker_tx, tracker) = channel();
        let (activity_tx, activity) = channel();

        let mut auditor = Auditor::new();
        auditor
            .register(Arc::new(ChannelSubscriber::new(
                "tracker",
                SubscriberScope::All,
                tracker_tx,
            )))
            .unwrap();
        auditor
            .register(Arc::new(ChannelSubscriber::new(
                "activitylogs",
                SubscriberScope::ActorTriggered,
                activity_tx,
            )))
            .unwrap();

        Self {
            conn: open_db_in_memory().unwrap(),
            auditor,
            dispatcher: ChannelStopDispatcher::new(stop_tx),
            stops,
            tracker,
            activity,
            artifacts: RecordingCleaner::default(),
            ownership: OwnershipConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }

    pub fn service(&self) -> Service<'_> {
        self.service_with_artifacts(&self.artifacts)
    }

    pub fn service_with_artifacts<'a>(
        &'a self,
        artifacts: &'a dyn ArtifactCleaner,
    ) -> Service<'a> {
        ProjectService::new(
            SqliteProjectRepository::try_new(&self.conn).unwrap(),
            SqliteDependentRepository::try_new(&self.conn).unwrap(),
            OwnershipService::new(
                SqliteOwnerRepository::try_new(&self.conn).unwrap(),
                self.ownership.clone(),
            ),
            ProjectCollaborators {
                dispatcher: &self.dispatcher,
                auditor: &self.auditor,
                artifacts,
            },
            self.pagination,
        )
    }

    pub fn dependents(&self) -> DependentService<SqliteDependentRepository<'_>> {
        DependentService::new(SqliteDependentRepository::try_new(&self.conn).unwrap())
    }

    pub fn register(&self, username: &str) -> Actor {
        AccountService::new(SqliteAccountRepository::try_new(&self.conn).unwrap())
            .register_user(username, None)
            .unwrap()
            .as_actor()
    }

    pub fn create_project(&self, actor: &Actor, name: &str, is_public: bool) -> Project {
        self.service()
            .create_project(
                actor,
                &CreateProjectRequest {
                    name: Some(name.to_string()),
                    description: None,
                    is_public: Some(is_public),
                },
            )
            .unwrap()
    }

    /// Creates a dependent and walks it to `state` through legal transitions.
    pub fn add_dependent(
        &self,
        project_id: ProjectId,
        kind: DependentKind,
        name: &str,
        state: LifecycleState,
    ) -> Dependent {
        let service = self.dependents();
        let mut dependent = service
            .create_dependent(project_id, kind, name, None)
            .unwrap();
        for next in path_to(state) {
            dependent = service.transition(kind, dependent.id, *next).unwrap();
        }
        dependent
    }

    pub fn drain_stops(&self) -> Vec<StopCommand> {
        self.stops.try_iter().collect()
    }

    pub fn drain_tracker(&self) -> Vec<String> {
        self.tracker
            .try_iter()
            .map(|event| event.event_type.name())
            .collect()
    }

    pub fn drain_activity(&self) -> Vec<String> {
        self.activity
            .try_iter()
            .map(|event| event.event_type.name())
            .collect()
    }
}

pub fn path_to(state: LifecycleState) -> &'static [LifecycleState] {
    use LifecycleState::*;
    match state {
        Created => &[],
        Scheduled => &[Scheduled],
        Running => &[Scheduled, Running],
        Succeeded => &[Scheduled, Running, Succeeded],
        Failed => &[Failed],
        Stopped => &[Scheduled, Stopped],
    }
}
