//! Core domain logic for trialhub.
//! This crate is the single source of truth for ownership and project
//! lifecycle invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod outbound;
pub mod repo;
pub mod service;

pub use config::{ConfigError, LoggingConfig, OwnershipConfig, PaginationConfig, PlatformConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::account::{Actor, Organization, Team, User};
pub use model::ids::{DependentId, OrganizationId, OwnerId, ProjectId, TeamId, UserId};
pub use model::lifecycle::{Dependent, DependentKind, LifecycleState};
pub use model::owner::{Ownable, OwnableRef, Owner, OwnerKind, OwnerTarget};
pub use model::project::{
    BookmarkedProject, CreateProjectRequest, Project, ProjectDetail, ProjectPatch,
};
pub use model::validation::ValidationError;
pub use model::version::{VersionKind, VersionRecord};
pub use outbound::artifacts::{
    cleaner_from_config, ArtifactCleaner, ArtifactError, FsArtifactCleaner, NoopArtifactCleaner,
};
pub use outbound::auditor::{
    AuditEvent, AuditEventType, Auditor, ChannelSubscriber, EventSubscriber, LogSubscriber,
    SubscriberScope,
};
pub use outbound::dispatcher::{ChannelStopDispatcher, DispatchError, StopCommand, StopDispatcher};
pub use repo::{RepoError, RepoResult};
pub use service::account_service::AccountService;
pub use service::dependent_service::{DependentService, LifecycleError};
pub use service::ownership_service::{OwnerSource, OwnershipError, OwnershipService};
pub use service::project_service::{
    DeleteReport, ErrorClass, PageRequest, ProjectCollaborators, ProjectError, ProjectPage,
    ProjectService,
};
pub use service::version_service::{VersionError, VersionService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
