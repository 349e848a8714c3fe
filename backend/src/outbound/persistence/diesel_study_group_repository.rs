//! PostgreSQL-backed `StudyGroupRepository` implementation using Diesel ORM.
//!
//! The group row and the full participant set are read and written together
//! inside one transaction. Saves are guarded by the group row's `revision`
//! column: the update only matches while the stored revision equals the one
//! the aggregate was loaded at.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{StudyGroupRepository, StudyGroupRepositoryError};
use crate::domain::{
    GroupInfo, LifecycleState, Participant, ParticipantRole, ParticipantStatus, RecruitingPolicy,
    StudyGroup, StudyGroupId, StudyGroupSnapshot, UserId,
};

use super::diesel_helpers::{cast_for_db, cast_from_db, map_diesel_error, map_pool_error};
use super::models::{NewStudyGroupRow, ParticipantRow, StudyGroupRow, StudyGroupUpdate};
use super::pool::DbPool;
use super::schema::{study_group_participants, study_groups};

/// Failure inside a write transaction.
///
/// Diesel needs `From<diesel::result::Error>` on the transaction error type;
/// revision conflicts detected mid-transaction travel as `Repository`.
#[derive(Debug)]
enum TransactionFailure {
    Diesel(diesel::result::Error),
    Repository(StudyGroupRepositoryError),
}

impl From<diesel::result::Error> for TransactionFailure {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<TransactionFailure> for StudyGroupRepositoryError {
    fn from(value: TransactionFailure) -> Self {
        match value {
            TransactionFailure::Diesel(err) => map_diesel_error(err),
            TransactionFailure::Repository(err) => err,
        }
    }
}

/// Diesel-backed implementation of the `StudyGroupRepository` port.
#[derive(Clone)]
pub struct DieselStudyGroupRepository {
    pool: DbPool,
}

impl DieselStudyGroupRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_participant(row: ParticipantRow) -> Result<Participant, StudyGroupRepositoryError> {
    let status = row
        .status
        .parse::<ParticipantStatus>()
        .map_err(|err| StudyGroupRepositoryError::query(err.to_string()))?;
    let role = row
        .role
        .parse::<ParticipantRole>()
        .map_err(|err| StudyGroupRepositoryError::query(err.to_string()))?;
    Ok(Participant::restore(
        UserId::from_uuid(row.user_id),
        StudyGroupId::from_uuid(row.group_id),
        status,
        role,
    ))
}

fn participant_row(participant: &Participant) -> ParticipantRow {
    ParticipantRow {
        group_id: *participant.group_id().as_uuid(),
        user_id: *participant.user_id().as_uuid(),
        status: participant.status().as_str().to_owned(),
        role: participant.role().as_str().to_owned(),
    }
}

/// Rebuild an aggregate from its rows, refusing anything that breaks the
/// aggregate invariants.
fn rows_to_group(
    row: StudyGroupRow,
    participant_rows: Vec<ParticipantRow>,
) -> Result<StudyGroup, StudyGroupRepositoryError> {
    let corrupt = |detail: String| {
        StudyGroupRepositoryError::query(format!("corrupt study group {}: {detail}", row.id))
    };

    let policy = row
        .policy
        .parse::<RecruitingPolicy>()
        .map_err(|err| corrupt(err.to_string()))?;
    let state = row
        .state
        .parse::<LifecycleState>()
        .map_err(|err| corrupt(err.to_string()))?;
    let capacity = cast_from_db(row.capacity, "capacity")?;
    let revision = cast_from_db(row.revision, "revision")?;
    let info = GroupInfo::restore(row.title.clone(), capacity, row.deadline, policy, state)
        .map_err(|err| corrupt(err.to_string()))?;
    let participants = participant_rows
        .into_iter()
        .map(row_to_participant)
        .collect::<Result<Vec<_>, _>>()?;

    let group = StudyGroup::restore(StudyGroupSnapshot {
        id: StudyGroupId::from_uuid(row.id),
        info,
        participants,
        created_at: row.created_at,
        revision,
    })
    .map_err(|err| corrupt(err.to_string()))?;

    if *group.host_id().as_uuid() != row.host_id {
        return Err(corrupt("host column disagrees with host participant".to_owned()));
    }
    Ok(group)
}

/// Load participants for every row and rebuild the aggregates, preserving
/// row order.
async fn hydrate_groups(
    conn: &mut AsyncPgConnection,
    rows: Vec<StudyGroupRow>,
) -> Result<Vec<StudyGroup>, StudyGroupRepositoryError> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let participant_rows: Vec<ParticipantRow> = study_group_participants::table
        .filter(study_group_participants::group_id.eq_any(ids))
        .select(ParticipantRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel_error)?;

    let mut by_group: HashMap<Uuid, Vec<ParticipantRow>> = HashMap::new();
    for participant in participant_rows {
        by_group
            .entry(participant.group_id)
            .or_default()
            .push(participant);
    }

    rows.into_iter()
        .map(|row| {
            let participants = by_group.remove(&row.id).unwrap_or_default();
            rows_to_group(row, participants)
        })
        .collect()
}

async fn replace_participants(
    conn: &mut AsyncPgConnection,
    group: &StudyGroup,
) -> Result<(), diesel::result::Error> {
    let group_uuid = *group.id().as_uuid();
    diesel::delete(
        study_group_participants::table.filter(study_group_participants::group_id.eq(group_uuid)),
    )
    .execute(conn)
    .await?;

    let rows: Vec<ParticipantRow> = group.participants().map(participant_row).collect();
    diesel::insert_into(study_group_participants::table)
        .values(&rows)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl StudyGroupRepository for DieselStudyGroupRepository {
    async fn load_with_participants(
        &self,
        group_id: StudyGroupId,
    ) -> Result<StudyGroup, StudyGroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let group_uuid = *group_id.as_uuid();

        let (row, participant_rows) = conn
            .transaction(|conn| {
                async move {
                    let row: Option<StudyGroupRow> = study_groups::table
                        .filter(study_groups::id.eq(group_uuid))
                        .select(StudyGroupRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    let participants: Vec<ParticipantRow> = study_group_participants::table
                        .filter(study_group_participants::group_id.eq(group_uuid))
                        .select(ParticipantRow::as_select())
                        .load(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>((row, participants))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let row = row.ok_or(StudyGroupRepositoryError::not_found(group_id))?;
        rows_to_group(row, participant_rows)
    }

    async fn save_new(
        &self,
        group: &StudyGroup,
    ) -> Result<StudyGroupId, StudyGroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let info = group.info();
        let new_row = NewStudyGroupRow {
            id: *group.id().as_uuid(),
            host_id: *group.host_id().as_uuid(),
            title: info.title(),
            capacity: cast_for_db(info.capacity(), "capacity")?,
            deadline: info.deadline(),
            policy: info.policy().as_str(),
            state: info.state().as_str(),
            created_at: group.created_at(),
            revision: cast_for_db(group.revision(), "revision")?,
        };

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(study_groups::table)
                    .values(&new_row)
                    .execute(conn)
                    .await?;
                replace_participants(conn, group).await
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)?;

        debug!(group_id = %group.id(), "study group inserted");
        Ok(group.id())
    }

    async fn save(&self, group: &StudyGroup) -> Result<(), StudyGroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let group_uuid = *group.id().as_uuid();
        let expected = group.revision();
        let expected_db = cast_for_db(expected, "revision")?;
        let info = group.info();
        let update = StudyGroupUpdate {
            title: info.title(),
            capacity: cast_for_db(info.capacity(), "capacity")?,
            deadline: info.deadline(),
            policy: info.policy().as_str(),
            state: info.state().as_str(),
            revision: cast_for_db(expected.saturating_add(1), "revision")?,
        };

        conn.transaction(|conn| {
            async move {
                let updated_rows = diesel::update(study_groups::table)
                    .filter(
                        study_groups::id
                            .eq(group_uuid)
                            .and(study_groups::revision.eq(expected_db)),
                    )
                    .set(&update)
                    .execute(conn)
                    .await?;

                if updated_rows == 0 {
                    let current: Option<i32> = study_groups::table
                        .filter(study_groups::id.eq(group_uuid))
                        .select(study_groups::revision)
                        .first(conn)
                        .await
                        .optional()?;
                    let failure = match current {
                        Some(actual) => StudyGroupRepositoryError::revision_mismatch(
                            expected,
                            cast_from_db(actual, "revision")
                                .map_err(TransactionFailure::Repository)?,
                        ),
                        None => StudyGroupRepositoryError::not_found(group.id()),
                    };
                    return Err(TransactionFailure::Repository(failure));
                }

                replace_participants(conn, group).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(StudyGroupRepositoryError::from)
    }

    async fn delete(&self, group_id: StudyGroupId) -> Result<(), StudyGroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // Participant rows go with the group through ON DELETE CASCADE.
        let deleted =
            diesel::delete(study_groups::table.filter(study_groups::id.eq(group_id.as_uuid())))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;

        if deleted == 0 {
            return Err(StudyGroupRepositoryError::not_found(group_id));
        }
        Ok(())
    }

    async fn list(
        &self,
        state: Option<LifecycleState>,
    ) -> Result<Vec<StudyGroup>, StudyGroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = study_groups::table
            .select(StudyGroupRow::as_select())
            .order_by(study_groups::created_at.desc())
            .into_boxed();
        if let Some(state) = state {
            query = query.filter(study_groups::state.eq(state.as_str()));
        }
        let rows: Vec<StudyGroupRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;

        hydrate_groups(&mut conn, rows).await
    }

    async fn list_for_member(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StudyGroup>, StudyGroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let member_of = study_group_participants::table
            .filter(study_group_participants::user_id.eq(*user_id.as_uuid()))
            .filter(study_group_participants::status.eq(ParticipantStatus::Approved.as_str()))
            .select(study_group_participants::group_id);
        let rows: Vec<StudyGroupRow> = study_groups::table
            .filter(study_groups::id.eq_any(member_of))
            .select(StudyGroupRow::as_select())
            .order_by(study_groups::created_at.desc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        hydrate_groups(&mut conn, rows).await
    }
}
