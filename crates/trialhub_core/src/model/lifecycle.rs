//! Dependent kinds and their lifecycle state machine.
//!
//! # Responsibility
//! - Enumerate every record family scoped to a project.
//! - Define which lifecycle states are active, terminal, and reachable.
//!
//! # Invariants
//! - Only `Scheduled` and `Running` are active.
//! - Terminal states admit no further transition.
//! - `DependentKind::ALL` order is the cascade stop order.

use crate::model::ids::{DependentId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Record family owned by a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentKind {
    ExperimentGroup,
    Experiment,
    Job,
    BuildJob,
    NotebookJob,
    TensorboardJob,
}

impl DependentKind {
    /// Cascade order: groups before their experiments, plugins last.
    pub const ALL: [DependentKind; 6] = [
        Self::ExperimentGroup,
        Self::Experiment,
        Self::Job,
        Self::BuildJob,
        Self::NotebookJob,
        Self::TensorboardJob,
    ];

    /// Storage table holding this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::ExperimentGroup => "experiment_groups",
            Self::Experiment => "experiments",
            Self::Job => "jobs",
            Self::BuildJob => "build_jobs",
            Self::NotebookJob => "notebook_jobs",
            Self::TensorboardJob => "tensorboard_jobs",
        }
    }

    /// Content-type tag used by audit targets.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::ExperimentGroup => "experimentgroup",
            Self::Experiment => "experiment",
            Self::Job => "job",
            Self::BuildJob => "buildjob",
            Self::NotebookJob => "notebookjob",
            Self::TensorboardJob => "tensorboardjob",
        }
    }
}

impl Display for DependentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.content_type())
    }
}

/// Lifecycle state shared by all dependent kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Scheduled,
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl LifecycleState {
    pub const ACTIVE: [LifecycleState; 2] = [Self::Scheduled, Self::Running];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "scheduled" => Some(Self::Scheduled),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Eligible for a stop command on cascade delete.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Scheduled | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Stopped)
    }

    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Created, Scheduled | Failed | Stopped)
                | (Scheduled, Running | Failed | Stopped)
                | (Running, Succeeded | Failed | Stopped)
        )
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dependent record of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    pub id: DependentId,
    pub kind: DependentKind,
    pub project_id: ProjectId,
    /// Only experiments may belong to a group.
    pub experiment_group_id: Option<DependentId>,
    pub name: String,
    pub state: LifecycleState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Dependent {
    /// Creates an unsaved dependent in `Created` state.
    pub fn new(kind: DependentKind, project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id: DependentId::new(),
            kind,
            project_id,
            experiment_group_id: None,
            name: name.into(),
            state: LifecycleState::Created,
            created_at: 0,
            updated_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DependentKind, LifecycleState};

    const ALL_STATES: [LifecycleState; 6] = [
        LifecycleState::Created,
        LifecycleState::Scheduled,
        LifecycleState::Running,
        LifecycleState::Succeeded,
        LifecycleState::Failed,
        LifecycleState::Stopped,
    ];

    #[test]
    fn only_scheduled_and_running_are_active() {
        let active: Vec<_> = ALL_STATES.into_iter().filter(|s| s.is_active()).collect();
        assert_eq!(active, LifecycleState::ACTIVE.to_vec());
        assert!(!LifecycleState::Created.is_active());
        assert!(!LifecycleState::Created.is_terminal());
    }

    #[test]
    fn terminal_states_are_sinks() {
        for from in ALL_STATES.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL_STATES {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn happy_path_is_allowed_and_skips_are_not() {
        assert!(LifecycleState::Created.can_transition_to(LifecycleState::Scheduled));
        assert!(LifecycleState::Scheduled.can_transition_to(LifecycleState::Running));
        assert!(LifecycleState::Running.can_transition_to(LifecycleState::Succeeded));
        assert!(!LifecycleState::Created.can_transition_to(LifecycleState::Running));
        assert!(!LifecycleState::Running.can_transition_to(LifecycleState::Scheduled));
    }

    #[test]
    fn state_tags_round_trip() {
        for state in ALL_STATES {
            assert_eq!(LifecycleState::parse(state.as_str()), Some(state));
        }
    }

    #[test]
    fn kind_tables_are_distinct() {
        let mut tables: Vec<_> = DependentKind::ALL.iter().map(|k| k.table()).collect();
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), DependentKind::ALL.len());
    }
}
