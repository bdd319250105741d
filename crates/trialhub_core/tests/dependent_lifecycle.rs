mod common;

use common::Harness;
use trialhub_core::repo::dependent_repo::{DependentRepository, SqliteDependentRepository};
use trialhub_core::{
    DependentId, DependentKind, LifecycleError, LifecycleState, ProjectId, RepoError,
};

#[test]
fn new_dependents_start_created_with_timestamps() {
    let harness = Harness::new();
    let alice = harness.register("alice");
    let project = harness.create_project(&alice, "mnist", true);

    let created = harness
        .dependents()
        .create_dependent(project.id, DependentKind::NotebookJob, "notebook", None)
        .unwrap();

    assert_eq!(created.state, LifecycleState::Created);
    assert_eq!(created.kind, DependentKind::NotebookJob);
    assert!(created.created_at > 0);
    assert_eq!(created.experiment_group_id, None);
}

#[test]
fn transitions_follow_the_lifecycle_table() {
    let harness = Harness::new();
    let alice = harness.register("alice");
    let project = harness.create_project(&alice, "mnist", true);
    let service = harness.dependents();
    let job = service
        .create_dependent(project.id, DependentKind::Job, "train", None)
        .unwrap();

    let err = service
        .transition(DependentKind::Job, job.id, LifecycleState::Running)
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: LifecycleState::Created,
            to: LifecycleState::Running,
            ..
        }
    ));

    for next in [
        LifecycleState::Scheduled,
        LifecycleState::Running,
        LifecycleState::Succeeded,
    ] {
        let moved = service.transition(DependentKind::Job, job.id, next).unwrap();
        assert_eq!(moved.state, next);
    }

    let err = service
        .transition(DependentKind::Job, job.id, LifecycleState::Stopped)
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: LifecycleState::Succeeded,
            ..
        }
    ));
}

#[test]
fn list_active_returns_only_scheduled_and_running() {
    let harness = Harness::new();
    let alice = harness.register("alice");
    let project = harness.create_project(&alice, "mnist", true);
    let states = [
        LifecycleState::Created,
        LifecycleState::Scheduled,
        LifecycleState::Running,
        LifecycleState::Succeeded,
        LifecycleState::Failed,
        LifecycleState::Stopped,
    ];
    for (index, state) in states.into_iter().enumerate() {
        harness.add_dependent(project.id, DependentKind::BuildJob, &format!("b{index}"), state);
    }

    let repo = SqliteDependentRepository::try_new(&harness.conn).unwrap();
    let active = repo.list_active(project.id, DependentKind::BuildJob).unwrap();
    let active_states: Vec<_> = active.iter().map(|dependent| dependent.state).collect();
    assert_eq!(active_states, vec![LifecycleState::Scheduled, LifecycleState::Running]);
    assert_eq!(repo.count_for_project(project.id, DependentKind::BuildJob).unwrap(), 6);
    assert!(repo
        .list_for_project(project.id, DependentKind::BuildJob, Some(&[]))
        .unwrap()
        .is_empty());
}

#[test]
fn experiment_groups_are_only_for_experiments_of_the_same_project() {
    let harness = Harness::new();
    let alice = harness.register("alice");
    let first = harness.create_project(&alice, "first", true);
    let second = harness.create_project(&alice, "second", true);
    let service = harness.dependents();
    let group = service
        .create_dependent(first.id, DependentKind::ExperimentGroup, "sweep", None)
        .unwrap();

    let err = service
        .create_dependent(first.id, DependentKind::Job, "job", Some(group.id))
        .unwrap_err();
    assert!(matches!(err, LifecycleError::GroupNotAllowed(DependentKind::Job)));

    let err = service
        .create_dependent(second.id, DependentKind::Experiment, "trial", Some(group.id))
        .unwrap_err();
    assert!(matches!(err, LifecycleError::GroupProjectMismatch { .. }));

    let err = service
        .create_dependent(first.id, DependentKind::Experiment, "trial", Some(DependentId::new()))
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::NotFound {
            kind: DependentKind::ExperimentGroup,
            ..
        }
    ));
}

#[test]
fn dependent_of_missing_project_is_a_reference_error() {
    let harness = Harness::new();

    let err = harness
        .dependents()
        .create_dependent(ProjectId::new(), DependentKind::Experiment, "orphan", None)
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Repo(RepoError::ForeignKey { entity: "experiment", .. })
    ));
}

#[test]
fn unknown_dependent_is_not_found() {
    let harness = Harness::new();
    let err = harness
        .dependents()
        .transition(DependentKind::Experiment, DependentId::new(), LifecycleState::Scheduled)
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound { .. }));
}
