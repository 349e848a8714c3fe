//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes a table, regenerate with `diesel print-schema` or edit
//! by hand.

diesel::table! {
    /// Study group records, one row per aggregate.
    ///
    /// `revision` is the optimistic concurrency marker checked on every save.
    study_groups (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// User who created and administers the group.
        host_id -> Uuid,
        /// Group title (1..=20 characters).
        title -> Varchar,
        /// Maximum number of APPROVED participants, host included.
        capacity -> Int4,
        /// Recruiting deadline.
        deadline -> Timestamptz,
        /// Recruiting policy: `auto` or `approval`.
        policy -> Varchar,
        /// Lifecycle state: `recruiting`, `start` or `close`.
        state -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Version marker, starting at 1.
        revision -> Int4,
    }
}

diesel::table! {
    /// Participant records. The whole set for a group is rewritten with the
    /// group row.
    study_group_participants (group_id, user_id) {
        /// Owning group.
        group_id -> Uuid,
        /// Participating user.
        user_id -> Uuid,
        /// Participation status in lowercase.
        status -> Varchar,
        /// `host` or `member`.
        role -> Varchar,
    }
}

diesel::joinable!(study_group_participants -> study_groups (group_id));
diesel::allow_tables_to_appear_in_same_query!(study_groups, study_group_participants);
