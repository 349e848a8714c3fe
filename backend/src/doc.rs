//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: study group commands and queries plus the health checks
//! - **Schemas**: request and response DTOs and the domain wrappers from
//!   [`crate::inbound::http::schemas`]
//! - **Security**: Session cookie authentication scheme
//!
//! The group channel WebSocket is not described here; OpenAPI has no
//! vocabulary for its frames.

use crate::inbound::http::schemas::{
    ErrorCodeSchema, ErrorSchema, LifecycleStateSchema, ParticipantRoleSchema,
    ParticipantStatusSchema, RecruitingPolicySchema,
};
use crate::inbound::http::study_groups::{
    ApprovedParticipantResponse, ApprovedParticipantsResponse, ChangePolicyBody,
    CreateStudyGroupBody, ParticipantResponse, StudyGroupListResponse, StudyGroupResponse,
    StudyGroupSummaryResponse,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by the identity provider.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Groupstudy backend API",
        description = "Study group recruitment, membership and lifecycle management.",
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::study_groups::create_study_group,
        crate::inbound::http::study_groups::list_study_groups,
        crate::inbound::http::study_groups::get_study_group,
        crate::inbound::http::study_groups::delete_study_group,
        crate::inbound::http::study_groups::start_study_group,
        crate::inbound::http::study_groups::close_study_group,
        crate::inbound::http::study_groups::change_policy,
        crate::inbound::http::study_groups::apply_to_study_group,
        crate::inbound::http::study_groups::cancel_application,
        crate::inbound::http::study_groups::leave_study_group,
        crate::inbound::http::study_groups::approve_applicant,
        crate::inbound::http::study_groups::reject_applicant,
        crate::inbound::http::study_groups::kick_participant,
        crate::inbound::http::study_groups::list_participants,
        crate::inbound::http::study_groups::my_study_groups,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        RecruitingPolicySchema,
        LifecycleStateSchema,
        ParticipantStatusSchema,
        ParticipantRoleSchema,
        CreateStudyGroupBody,
        ChangePolicyBody,
        ParticipantResponse,
        StudyGroupResponse,
        StudyGroupSummaryResponse,
        StudyGroupListResponse,
        ApprovedParticipantResponse,
        ApprovedParticipantsResponse,
    )),
    tags(
        (name = "study-groups", description = "Recruitment, membership and lifecycle of study groups"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
