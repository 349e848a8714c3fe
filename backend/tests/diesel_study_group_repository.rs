//! Integration tests for `DieselStudyGroupRepository` against embedded
//! PostgreSQL.
//!
//! These exercise the revision-guarded `UPDATE` that the in-memory adapter
//! only imitates. They need the embedded cluster binaries, so they are opt-in:
//! run with `cargo test --test diesel_study_group_repository -- --ignored`.

use chrono::Utc;
use groupstudy::domain::ports::{StudyGroupRepository, StudyGroupRepositoryError};
use groupstudy::domain::{
    GroupInfo, INITIAL_REVISION, ParticipantStatus, RecruitingPolicy, StudyGroup, StudyGroupId,
    UserId,
};
use groupstudy::outbound::persistence::{DbPool, DieselStudyGroupRepository, PoolConfig};
use pg_embedded_setup_unpriv::{TemporaryDatabase, TestCluster};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{handle_cluster_setup_failure, provision_database};

/// Fields drop in order: the pool closes before its database, and the
/// database before the cluster.
struct TestContext {
    runtime: Runtime,
    repository: DieselStudyGroupRepository,
    _database: TemporaryDatabase,
    _cluster: TestCluster,
}

fn setup_test_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = TestCluster::new().map_err(|err| format!("{err:?}"))?;
    let database = provision_database(&cluster)?;

    let config = PoolConfig::new(database.url())
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        repository: DieselStudyGroupRepository::new(pool),
        _database: database,
        _cluster: cluster,
    })
}

#[fixture]
fn diesel_world() -> Option<TestContext> {
    match setup_test_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn new_group() -> StudyGroup {
    let now = Utc::now();
    let info = GroupInfo::create(
        "Storage study",
        3,
        now + chrono::Duration::days(7),
        RecruitingPolicy::Auto,
    )
    .expect("valid info");
    StudyGroup::create(StudyGroupId::random(), UserId::random(), info, now)
}

#[rstest]
#[ignore = "requires embedded PostgreSQL; run with --ignored"]
fn stale_save_is_refused_and_keeps_the_winner(diesel_world: Option<TestContext>) {
    let Some(ctx) = diesel_world else {
        return;
    };
    let repository = &ctx.repository;
    let group = new_group();
    let group_id = group.id();
    let (winner, loser) = (UserId::random(), UserId::random());

    let (saved, stale, stored) = ctx.runtime.block_on(async {
        repository.save_new(&group).await.expect("group inserted");
        let mut first = repository
            .load_with_participants(group_id)
            .await
            .expect("first load");
        let mut second = repository
            .load_with_participants(group_id)
            .await
            .expect("second load");

        first.apply(winner).expect("first application");
        let saved = repository.save(&first).await;
        second.apply(loser).expect("second application");
        let stale = repository.save(&second).await;
        let stored = repository
            .load_with_participants(group_id)
            .await
            .expect("reload");
        (saved, stale, stored)
    });

    assert!(saved.is_ok(), "first save: {saved:?}");
    assert_eq!(
        stale,
        Err(StudyGroupRepositoryError::revision_mismatch(
            INITIAL_REVISION,
            INITIAL_REVISION + 1
        ))
    );
    assert_eq!(stored.revision(), INITIAL_REVISION + 1);
    assert_eq!(
        stored.participant(winner).map(|p| p.status()),
        Some(ParticipantStatus::Approved)
    );
    assert!(stored.participant(loser).is_none());
}

#[rstest]
#[ignore = "requires embedded PostgreSQL; run with --ignored"]
fn saving_a_deleted_group_reports_not_found(diesel_world: Option<TestContext>) {
    let Some(ctx) = diesel_world else {
        return;
    };
    let repository = &ctx.repository;
    let mut group = new_group();
    let group_id = group.id();

    let (saved, loaded) = ctx.runtime.block_on(async {
        repository.save_new(&group).await.expect("group inserted");
        repository.delete(group_id).await.expect("group deleted");
        group.apply(UserId::random()).expect("application");
        (
            repository.save(&group).await,
            repository.load_with_participants(group_id).await,
        )
    });

    assert_eq!(saved, Err(StudyGroupRepositoryError::not_found(group_id)));
    assert!(matches!(
        loaded,
        Err(StudyGroupRepositoryError::NotFound { .. })
    ));
}
