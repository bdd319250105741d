//! Stop command dispatch towards the task scheduler.

use crate::model::account::Actor;
use crate::model::ids::{DependentId, ProjectId};
use crate::model::lifecycle::DependentKind;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;

/// Request to stop one running or scheduled dependent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopCommand {
    pub kind: DependentKind,
    pub dependent_id: DependentId,
    pub project_id: ProjectId,
    /// User who triggered the stop, when known.
    pub actor: Option<Actor>,
}

impl StopCommand {
    /// Scheduler task addressed by this command.
    pub fn task_name(&self) -> &'static str {
        match self.kind {
            DependentKind::ExperimentGroup => "experiment_groups.stop",
            DependentKind::Experiment => "experiments.stop",
            DependentKind::Job => "jobs.stop",
            DependentKind::BuildJob => "build_jobs.stop",
            DependentKind::NotebookJob => "projects.notebook.stop",
            DependentKind::TensorboardJob => "tensorboards.stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Receiving side has gone away.
    Disconnected { task_name: &'static str },
    /// Transport refused the command.
    Rejected {
        task_name: &'static str,
        reason: String,
    },
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected { task_name } => {
                write!(f, "dispatcher disconnected while sending `{task_name}`")
            }
            Self::Rejected { task_name, reason } => {
                write!(f, "dispatcher rejected `{task_name}`: {reason}")
            }
        }
    }
}

impl Error for DispatchError {}

/// Fire-and-forget delivery of stop commands.
pub trait StopDispatcher {
    fn dispatch(&self, command: StopCommand) -> Result<(), DispatchError>;
}

/// Dispatcher publishing onto an in-process channel.
#[derive(Clone, Debug)]
pub struct ChannelStopDispatcher {
    tx: Sender<StopCommand>,
}

impl ChannelStopDispatcher {
    pub fn new(tx: Sender<StopCommand>) -> Self {
        Self { tx }
    }
}

impl StopDispatcher for ChannelStopDispatcher {
    fn dispatch(&self, command: StopCommand) -> Result<(), DispatchError> {
        let task_name = command.task_name();
        self.tx
            .send(command)
            .map_err(|_| DispatchError::Disconnected { task_name })
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelStopDispatcher, DispatchError, StopCommand, StopDispatcher};
    use crate::model::ids::{DependentId, ProjectId};
    use crate::model::lifecycle::DependentKind;
    use std::sync::mpsc::channel;

    fn command(kind: DependentKind) -> StopCommand {
        StopCommand {
            kind,
            dependent_id: DependentId::new(),
            project_id: ProjectId::new(),
            actor: None,
        }
    }

    #[test]
    fn task_names_match_scheduler_tasks() {
        assert_eq!(command(DependentKind::Experiment).task_name(), "experiments.stop");
        assert_eq!(
            command(DependentKind::NotebookJob).task_name(),
            "projects.notebook.stop"
        );
        assert_eq!(
            command(DependentKind::TensorboardJob).task_name(),
            "tensorboards.stop"
        );
    }

    #[test]
    fn channel_dispatcher_delivers_commands_in_order() {
        let (tx, rx) = channel();
        let dispatcher = ChannelStopDispatcher::new(tx);
        let first = command(DependentKind::Job);
        let second = command(DependentKind::BuildJob);

        dispatcher.dispatch(first.clone()).unwrap();
        dispatcher.dispatch(second.clone()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), first);
        assert_eq!(rx.try_recv().unwrap(), second);
    }

    #[test]
    fn closed_receiver_reports_disconnected() {
        let (tx, rx) = channel();
        drop(rx);
        let dispatcher = ChannelStopDispatcher::new(tx);

        let err = dispatcher
            .dispatch(command(DependentKind::ExperimentGroup))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Disconnected {
                task_name: "experiment_groups.stop"
            }
        );
    }
}
