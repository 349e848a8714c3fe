//! Study group HTTP handlers.
//!
//! ```text
//! POST   /api/v1/study-groups
//! GET    /api/v1/study-groups?state=RECRUITING
//! GET    /api/v1/study-groups/{id}
//! DELETE /api/v1/study-groups/{id}
//! POST   /api/v1/study-groups/{id}/start
//! POST   /api/v1/study-groups/{id}/close
//! PUT    /api/v1/study-groups/{id}/policy
//! POST   /api/v1/study-groups/{id}/applications
//! DELETE /api/v1/study-groups/{id}/applications/me
//! DELETE /api/v1/study-groups/{id}/participants/me
//! POST   /api/v1/study-groups/{id}/applicants/{userId}/approve
//! POST   /api/v1/study-groups/{id}/applicants/{userId}/reject
//! POST   /api/v1/study-groups/{id}/participants/{userId}/kick
//! GET    /api/v1/study-groups/{id}/participants
//! GET    /api/v1/users/me/study-groups
//! ```
//!
//! Every route requires a session. Handlers only translate between JSON and
//! the driving ports; membership rules live in the aggregate.

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    ApprovedParticipant, ChangePolicyRequest, CreateStudyGroupRequest, GroupActionRequest,
    ParticipantDecisionRequest, ParticipantView, StudyGroupDetail, StudyGroupSummary,
};
use crate::domain::{
    LifecycleState, ParticipantRole, ParticipantStatus, RecruitingPolicy, StudyGroupId, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{
    ErrorSchema, LifecycleStateSchema, ParticipantRoleSchema, ParticipantStatusSchema,
    RecruitingPolicySchema,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_group_id, parse_policy, parse_rfc3339_timestamp, parse_state,
    parse_user_id, require,
};

const GROUP_ID: FieldName = FieldName::new("id");
const TARGET_USER_ID: FieldName = FieldName::new("userId");
const TITLE: FieldName = FieldName::new("title");
const DEADLINE: FieldName = FieldName::new("deadline");
const POLICY: FieldName = FieldName::new("policy");
const STATE: FieldName = FieldName::new("state");

/// Request payload for creating a study group.
///
/// `capacity` is optional on the wire so a missing value surfaces as the
/// `missing_capacity` group rule rather than a JSON decoding failure.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudyGroupBody {
    #[schema(example = "Rust study")]
    pub title: Option<String>,
    #[schema(example = 4)]
    pub capacity: Option<u32>,
    #[schema(example = "2026-11-01T18:00:00Z")]
    pub deadline: Option<String>,
    /// Defaults to `APPROVAL`.
    #[schema(example = "APPROVAL")]
    pub policy: Option<String>,
}

/// Request payload for switching the recruiting policy.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePolicyBody {
    #[schema(example = "AUTO")]
    pub policy: Option<String>,
}

/// Query parameters for listing study groups.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListStudyGroupsQuery {
    /// Restrict to one lifecycle state.
    pub state: Option<String>,
}

/// One participant record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    #[schema(value_type = ParticipantStatusSchema)]
    pub status: ParticipantStatus,
    #[schema(value_type = ParticipantRoleSchema)]
    pub role: ParticipantRole,
}

impl From<ParticipantView> for ParticipantResponse {
    fn from(value: ParticipantView) -> Self {
        Self {
            user_id: value.user_id,
            status: value.status,
            role: value.role,
        }
    }
}

/// Full group view including every participant record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroupResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: StudyGroupId,
    pub title: String,
    pub capacity: u32,
    pub deadline: DateTime<Utc>,
    #[schema(value_type = RecruitingPolicySchema)]
    pub policy: RecruitingPolicy,
    #[schema(value_type = LifecycleStateSchema)]
    pub state: LifecycleState,
    #[schema(value_type = String, format = Uuid)]
    pub host_id: UserId,
    pub created_at: DateTime<Utc>,
    pub revision: u32,
    pub participants: Vec<ParticipantResponse>,
}

impl From<StudyGroupDetail> for StudyGroupResponse {
    fn from(value: StudyGroupDetail) -> Self {
        Self {
            id: value.id,
            title: value.title,
            capacity: value.capacity,
            deadline: value.deadline,
            policy: value.policy,
            state: value.state,
            host_id: value.host_id,
            created_at: value.created_at,
            revision: value.revision,
            participants: value
                .participants
                .into_iter()
                .map(ParticipantResponse::from)
                .collect(),
        }
    }
}

/// Listing row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroupSummaryResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: StudyGroupId,
    pub title: String,
    /// Approved participants, host included.
    pub current_members: u32,
    pub max_members: u32,
    #[schema(value_type = LifecycleStateSchema)]
    pub state: LifecycleState,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<StudyGroupSummary> for StudyGroupSummaryResponse {
    fn from(value: StudyGroupSummary) -> Self {
        Self {
            id: value.id,
            title: value.title,
            current_members: value.current_members,
            max_members: value.max_members,
            state: value.state,
            deadline: value.deadline,
            created_at: value.created_at,
        }
    }
}

/// Response payload for group listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroupListResponse {
    pub groups: Vec<StudyGroupSummaryResponse>,
}

impl From<Vec<StudyGroupSummary>> for StudyGroupListResponse {
    fn from(value: Vec<StudyGroupSummary>) -> Self {
        Self {
            groups: value
                .into_iter()
                .map(StudyGroupSummaryResponse::from)
                .collect(),
        }
    }
}

/// One approved participant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedParticipantResponse {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    #[schema(value_type = ParticipantRoleSchema)]
    pub role: ParticipantRole,
}

/// Response payload for the approved participant listing. Host first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedParticipantsResponse {
    pub participants: Vec<ApprovedParticipantResponse>,
}

impl From<Vec<ApprovedParticipant>> for ApprovedParticipantsResponse {
    fn from(value: Vec<ApprovedParticipant>) -> Self {
        Self {
            participants: value
                .into_iter()
                .map(|participant| ApprovedParticipantResponse {
                    user_id: participant.user_id,
                    role: participant.role,
                })
                .collect(),
        }
    }
}

fn group_action(session: &SessionContext, group_id: &str) -> ApiResult<GroupActionRequest> {
    Ok(GroupActionRequest {
        group_id: parse_group_id(group_id, GROUP_ID)?,
        acting_user: session.require_user_id()?,
    })
}

fn participant_decision(
    session: &SessionContext,
    (group_id, target_user): &(String, String),
) -> ApiResult<ParticipantDecisionRequest> {
    Ok(ParticipantDecisionRequest {
        group_id: parse_group_id(group_id, GROUP_ID)?,
        acting_user: session.require_user_id()?,
        target_user: parse_user_id(target_user, TARGET_USER_ID)?,
    })
}

fn detail_response(detail: StudyGroupDetail) -> HttpResponse {
    HttpResponse::Ok().json(StudyGroupResponse::from(detail))
}

/// Create a study group hosted by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/study-groups",
    request_body = CreateStudyGroupBody,
    responses(
        (status = 201, description = "Group created", body = StudyGroupResponse),
        (status = 400, description = "Invalid group attributes", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "createStudyGroup"
)]
#[post("/study-groups")]
pub async fn create_study_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateStudyGroupBody>,
) -> ApiResult<HttpResponse> {
    let host = session.require_user_id()?;
    let body = payload.into_inner();
    let deadline = require(body.deadline, DEADLINE)?;
    let request = CreateStudyGroupRequest {
        host,
        title: require(body.title, TITLE)?,
        capacity: body.capacity,
        deadline: parse_rfc3339_timestamp(&deadline, DEADLINE)?,
        policy: body
            .policy
            .map(|raw| parse_policy(&raw, POLICY))
            .transpose()?,
    };

    let detail = state.study_groups.create(request).await?;
    Ok(HttpResponse::Created().json(StudyGroupResponse::from(detail)))
}

/// List study groups, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/study-groups",
    params(ListStudyGroupsQuery),
    responses(
        (status = 200, description = "Groups", body = StudyGroupListResponse),
        (status = 400, description = "Unknown state filter", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "listStudyGroups"
)]
#[get("/study-groups")]
pub async fn list_study_groups(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListStudyGroupsQuery>,
) -> ApiResult<web::Json<StudyGroupListResponse>> {
    session.require_user_id()?;
    let filter = query
        .into_inner()
        .state
        .map(|raw| parse_state(&raw, STATE))
        .transpose()?;

    let groups = state.study_groups_query.list_groups(filter).await?;
    Ok(web::Json(groups.into()))
}

/// Fetch one group with every participant record.
#[utoipa::path(
    get,
    path = "/api/v1/study-groups/{id}",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 200, description = "Group", body = StudyGroupResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Unknown group", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "getStudyGroup"
)]
#[get("/study-groups/{id}")]
pub async fn get_study_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    session.require_user_id()?;
    let group_id = parse_group_id(&path, GROUP_ID)?;
    let detail = state.study_groups_query.group_detail(group_id).await?;
    Ok(detail_response(detail))
}

/// Delete a group. Host only.
#[utoipa::path(
    delete,
    path = "/api/v1/study-groups/{id}",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Caller is not the host", body = ErrorSchema),
        (status = 404, description = "Unknown group", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "deleteStudyGroup"
)]
#[delete("/study-groups/{id}")]
pub async fn delete_study_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = group_action(&session, &path)?;
    state.study_groups.delete(request).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Move a recruiting group to START. Host only.
#[utoipa::path(
    post,
    path = "/api/v1/study-groups/{id}/start",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 200, description = "Group started", body = StudyGroupResponse),
        (status = 400, description = "Group is not recruiting", body = ErrorSchema),
        (status = 403, description = "Caller is not the host", body = ErrorSchema),
        (status = 409, description = "Concurrent updates kept conflicting", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "startStudyGroup"
)]
#[post("/study-groups/{id}/start")]
pub async fn start_study_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = group_action(&session, &path)?;
    Ok(detail_response(state.study_groups.start(request).await?))
}

/// Move a started group to CLOSE. Host only.
#[utoipa::path(
    post,
    path = "/api/v1/study-groups/{id}/close",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 200, description = "Group closed", body = StudyGroupResponse),
        (status = 400, description = "Group has not started", body = ErrorSchema),
        (status = 403, description = "Caller is not the host", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "closeStudyGroup"
)]
#[post("/study-groups/{id}/close")]
pub async fn close_study_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = group_action(&session, &path)?;
    Ok(detail_response(state.study_groups.close(request).await?))
}

/// Switch between AUTO and APPROVAL recruiting. Host only.
#[utoipa::path(
    put,
    path = "/api/v1/study-groups/{id}/policy",
    params(("id" = String, Path, description = "Study group id")),
    request_body = ChangePolicyBody,
    responses(
        (status = 200, description = "Policy changed", body = StudyGroupResponse),
        (status = 400, description = "Unknown policy", body = ErrorSchema),
        (status = 403, description = "Caller is not the host", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "changeStudyGroupPolicy"
)]
#[put("/study-groups/{id}/policy")]
pub async fn change_policy(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ChangePolicyBody>,
) -> ApiResult<HttpResponse> {
    let GroupActionRequest {
        group_id,
        acting_user,
    } = group_action(&session, &path)?;
    let raw = require(payload.into_inner().policy, POLICY)?;
    let request = ChangePolicyRequest {
        group_id,
        acting_user,
        policy: parse_policy(&raw, POLICY)?,
    };
    Ok(detail_response(state.study_groups.change_policy(request).await?))
}

/// Apply to join a recruiting group.
#[utoipa::path(
    post,
    path = "/api/v1/study-groups/{id}/applications",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 200, description = "Application recorded", body = StudyGroupResponse),
        (status = 400, description = "Duplicate application, full or closed group", body = ErrorSchema),
        (status = 404, description = "Unknown group", body = ErrorSchema),
        (status = 409, description = "Concurrent updates kept conflicting", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "applyToStudyGroup"
)]
#[post("/study-groups/{id}/applications")]
pub async fn apply_to_study_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = group_action(&session, &path)?;
    Ok(detail_response(state.study_groups.apply(request).await?))
}

/// Withdraw the caller's pending application.
#[utoipa::path(
    delete,
    path = "/api/v1/study-groups/{id}/applications/me",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 200, description = "Application canceled", body = StudyGroupResponse),
        (status = 400, description = "No pending application", body = ErrorSchema),
        (status = 403, description = "Caller has no record in the group", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "cancelStudyGroupApplication"
)]
#[delete("/study-groups/{id}/applications/me")]
pub async fn cancel_application(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = group_action(&session, &path)?;
    Ok(detail_response(state.study_groups.cancel(request).await?))
}

/// Leave a group the caller was approved into.
#[utoipa::path(
    delete,
    path = "/api/v1/study-groups/{id}/participants/me",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 200, description = "Caller left", body = StudyGroupResponse),
        (status = 400, description = "Host cannot leave", body = ErrorSchema),
        (status = 403, description = "Caller has no record in the group", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "leaveStudyGroup"
)]
#[delete("/study-groups/{id}/participants/me")]
pub async fn leave_study_group(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = group_action(&session, &path)?;
    Ok(detail_response(state.study_groups.leave(request).await?))
}

/// Approve a pending applicant. Host only.
#[utoipa::path(
    post,
    path = "/api/v1/study-groups/{id}/applicants/{userId}/approve",
    params(
        ("id" = String, Path, description = "Study group id"),
        ("userId" = String, Path, description = "Applicant user id")
    ),
    responses(
        (status = 200, description = "Applicant approved", body = StudyGroupResponse),
        (status = 400, description = "Group full or applicant not pending", body = ErrorSchema),
        (status = 403, description = "Caller is not the host", body = ErrorSchema),
        (status = 409, description = "Concurrent updates kept conflicting", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "approveApplicant"
)]
#[post("/study-groups/{id}/applicants/{user_id}/approve")]
pub async fn approve_applicant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let request = participant_decision(&session, &path)?;
    Ok(detail_response(state.study_groups.approve(request).await?))
}

/// Reject a pending applicant. Host only.
#[utoipa::path(
    post,
    path = "/api/v1/study-groups/{id}/applicants/{userId}/reject",
    params(
        ("id" = String, Path, description = "Study group id"),
        ("userId" = String, Path, description = "Applicant user id")
    ),
    responses(
        (status = 200, description = "Applicant rejected", body = StudyGroupResponse),
        (status = 400, description = "Applicant not pending", body = ErrorSchema),
        (status = 403, description = "Caller is not the host", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "rejectApplicant"
)]
#[post("/study-groups/{id}/applicants/{user_id}/reject")]
pub async fn reject_applicant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let request = participant_decision(&session, &path)?;
    Ok(detail_response(state.study_groups.reject(request).await?))
}

/// Remove an approved member. Host only; the host cannot be kicked.
#[utoipa::path(
    post,
    path = "/api/v1/study-groups/{id}/participants/{userId}/kick",
    params(
        ("id" = String, Path, description = "Study group id"),
        ("userId" = String, Path, description = "Member user id")
    ),
    responses(
        (status = 200, description = "Member kicked", body = StudyGroupResponse),
        (status = 400, description = "Target is the host or not approved", body = ErrorSchema),
        (status = 403, description = "Caller is not the host", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "kickParticipant"
)]
#[post("/study-groups/{id}/participants/{user_id}/kick")]
pub async fn kick_participant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let request = participant_decision(&session, &path)?;
    Ok(detail_response(state.study_groups.kick(request).await?))
}

/// Approved participants of a group, host first.
#[utoipa::path(
    get,
    path = "/api/v1/study-groups/{id}/participants",
    params(("id" = String, Path, description = "Study group id")),
    responses(
        (status = 200, description = "Approved participants", body = ApprovedParticipantsResponse),
        (status = 404, description = "Unknown group", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "listApprovedParticipants"
)]
#[get("/study-groups/{id}/participants")]
pub async fn list_participants(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ApprovedParticipantsResponse>> {
    session.require_user_id()?;
    let group_id = parse_group_id(&path, GROUP_ID)?;
    let participants = state
        .study_groups_query
        .approved_participants(group_id)
        .await?;
    Ok(web::Json(participants.into()))
}

/// Groups the caller is an approved member of.
#[utoipa::path(
    get,
    path = "/api/v1/users/me/study-groups",
    responses(
        (status = 200, description = "Caller's groups", body = StudyGroupListResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["study-groups"],
    operation_id = "listMyStudyGroups"
)]
#[get("/users/me/study-groups")]
pub async fn my_study_groups(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<StudyGroupListResponse>> {
    let user_id = session.require_user_id()?;
    let groups = state.study_groups_query.groups_for_member(user_id).await?;
    Ok(web::Json(groups.into()))
}

/// Register every study group route on a scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_study_group)
        .service(list_study_groups)
        .service(get_study_group)
        .service(delete_study_group)
        .service(start_study_group)
        .service(close_study_group)
        .service(change_policy)
        .service(apply_to_study_group)
        .service(cancel_application)
        .service(leave_study_group)
        .service(approve_applicant)
        .service(reject_applicant)
        .service(kick_participant)
        .service(list_participants)
        .service(my_study_groups);
}

#[cfg(test)]
#[path = "study_groups_tests.rs"]
mod tests;
