use rusqlite::Connection;
use trialhub_core::repo::account_repo::SqliteAccountRepository;
use trialhub_core::repo::owner_repo::SqliteOwnerRepository;
use trialhub_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use trialhub_core::{
    open_db_in_memory, AccountService, OwnerKind, OwnerSource, OwnerTarget, OwnershipConfig,
    OwnershipError, OwnershipService, Project, RepoError, TeamId, ValidationError,
};

fn ownership(
    conn: &Connection,
    config: OwnershipConfig,
) -> OwnershipService<SqliteOwnerRepository<'_>> {
    OwnershipService::new(SqliteOwnerRepository::try_new(conn).unwrap(), config)
}

fn accounts(conn: &Connection) -> AccountService<SqliteAccountRepository<'_>> {
    AccountService::new(SqliteAccountRepository::try_new(conn).unwrap())
}

#[test]
fn registering_accounts_creates_matching_owners() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let service = ownership(&conn, OwnershipConfig::default());

    let user = accounts.register_user("alice", Some("alice@example.com")).unwrap();
    let org = accounts.create_organization("acme").unwrap();
    let team = accounts.create_team("vision", Some(org.id)).unwrap();

    let user_owner = service.owner_by_name("alice").unwrap().unwrap();
    assert_eq!(user_owner.target, OwnerTarget::User(user.id));
    let org_owner = service
        .owner_by_target(OwnerTarget::Organization(org.id))
        .unwrap()
        .unwrap();
    assert_eq!(org_owner.name, "acme");
    let team_owner = service.owner_by_name("vision").unwrap().unwrap();
    assert_eq!(team_owner.kind(), OwnerKind::Team);
    assert_eq!(accounts.get_team(team.id).unwrap().unwrap().organization_id, Some(org.id));
}

#[test]
fn registering_taken_name_fails_without_partial_rows() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    accounts.register_user("alice", None).unwrap();

    let err = accounts.create_organization("alice").unwrap_err();
    assert!(matches!(
        err,
        OwnershipError::Validation(ValidationError::NameTaken(ref name)) if name == "alice"
    ));

    let orgs: i64 = conn
        .query_row("SELECT COUNT(*) FROM organizations;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orgs, 0);
}

#[test]
fn set_owner_by_name_then_commit_persists_owner_pointer() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let alice = accounts.register_user("alice", None).unwrap();
    accounts.create_team("vision", None).unwrap();
    let service = ownership(&conn, OwnershipConfig::default());
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();

    let mut project = Project::draft("mnist", alice.id);
    service.set_default_owner(&mut project, &alice.as_actor()).unwrap();
    projects.create_project(&project).unwrap();

    let team_owner = service
        .set_owner(&mut project, OwnerSource::Name("vision".to_string()), true)
        .unwrap();
    assert_eq!(team_owner.name, "vision");

    let stored = projects.get_project(project.id).unwrap().unwrap();
    assert_eq!(stored.owner_id, Some(team_owner.id));
    let owner = service.owner_by_id(team_owner.id).unwrap().unwrap();
    assert_eq!(owner.name, "vision");
}

#[test]
fn set_owner_by_name_matches_the_name_exactly() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let alice = accounts.register_user("alice", None).unwrap();
    let service = ownership(&conn, OwnershipConfig::default());
    let mut project = Project::draft("mnist", alice.id);

    for padded in [" alice ", "alice ", "ALICE"] {
        let err = service
            .set_owner(&mut project, OwnerSource::Name(padded.to_string()), false)
            .unwrap_err();
        assert!(matches!(err, OwnershipError::OwnerNotFound));
    }
    assert_eq!(project.owner_id, None);

    let owner = service
        .set_owner(&mut project, OwnerSource::Name("alice".to_string()), false)
        .unwrap();
    assert_eq!(owner.name, "alice");
    assert_eq!(project.owner_id, Some(owner.id));
}

#[test]
fn allow_list_applies_to_every_resolution_path() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let alice = accounts.register_user("alice", None).unwrap();
    let team = accounts.create_team("vision", None).unwrap();
    let service = ownership(
        &conn,
        OwnershipConfig {
            allowed_owner_kinds: [OwnerKind::User].into_iter().collect(),
            allow_user_projects: true,
        },
    );
    let team_owner = service.owner_by_name("vision").unwrap().unwrap();
    let mut project = Project::draft("mnist", alice.id);

    let sources = [
        OwnerSource::Owner(team_owner),
        OwnerSource::Name("vision".to_string()),
        OwnerSource::Target(OwnerTarget::Team(team.id)),
    ];
    for source in sources {
        let err = service.set_owner(&mut project, source, false).unwrap_err();
        assert!(matches!(
            err,
            OwnershipError::OwnerKindNotAllowed(OwnerKind::Team)
        ));
    }
    assert_eq!(project.owner_id, None);
}

#[test]
fn create_owner_rejects_duplicate_name_and_duplicate_target() {
    let conn = open_db_in_memory().unwrap();
    let service = ownership(&conn, OwnershipConfig::default());
    let team_id = TeamId::new();

    service.create_owner(OwnerTarget::Team(team_id), "vision").unwrap();

    let by_name = service
        .create_owner(OwnerTarget::Team(TeamId::new()), "vision")
        .unwrap_err();
    assert!(matches!(
        by_name,
        OwnershipError::Validation(ValidationError::NameTaken(_))
    ));

    let by_target = service
        .create_owner(OwnerTarget::Team(team_id), "vision-2")
        .unwrap_err();
    assert!(matches!(by_target, OwnershipError::TargetAlreadyOwned(_)));
}

#[test]
fn delete_owner_is_silent_for_missing_names_and_blocked_while_in_use() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let alice = accounts.register_user("alice", None).unwrap();
    let service = ownership(&conn, OwnershipConfig::default());
    let projects = SqliteProjectRepository::try_new(&conn).unwrap();

    service.delete_owner("nobody").unwrap();
    service.delete_owner("nobody").unwrap();

    let mut project = Project::draft("mnist", alice.id);
    service.set_default_owner(&mut project, &alice.as_actor()).unwrap();
    projects.create_project(&project).unwrap();

    let err = service.delete_owner("alice").unwrap_err();
    assert!(matches!(err, OwnershipError::OwnerInUse(ref name) if name == "alice"));

    projects.delete_project(project.id).unwrap();
    service.delete_owner("alice").unwrap();
    assert!(service.owner_by_name("alice").unwrap().is_none());
    assert!(service.validate_owner_name("alice").is_ok());
}

#[test]
fn assigning_owner_to_missing_project_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let accounts = accounts(&conn);
    let alice = accounts.register_user("alice", None).unwrap();
    let service = ownership(&conn, OwnershipConfig::default());

    let mut project = Project::draft("ghost", alice.id);
    let err = service
        .set_owner(&mut project, OwnerSource::Name("alice".to_string()), true)
        .unwrap_err();
    assert!(matches!(
        err,
        OwnershipError::Repo(RepoError::NotFound { entity: "project", .. })
    ));
}
