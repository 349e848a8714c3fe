//! Internal Diesel row models. Never exposed outside the persistence module.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{study_group_participants, study_groups};

/// Row read from `study_groups`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = study_groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StudyGroupRow {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub capacity: i32,
    pub deadline: DateTime<Utc>,
    pub policy: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub revision: i32,
}

/// Insertable struct for new group records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = study_groups)]
pub(crate) struct NewStudyGroupRow<'a> {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: &'a str,
    pub capacity: i32,
    pub deadline: DateTime<Utc>,
    pub policy: &'a str,
    pub state: &'a str,
    pub created_at: DateTime<Utc>,
    pub revision: i32,
}

/// Changeset applied by a revision-guarded save.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = study_groups)]
pub(crate) struct StudyGroupUpdate<'a> {
    pub title: &'a str,
    pub capacity: i32,
    pub deadline: DateTime<Utc>,
    pub policy: &'a str,
    pub state: &'a str,
    pub revision: i32,
}

/// Participant row, used for both reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = study_group_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ParticipantRow {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub role: String,
}
