//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay free of `utoipa`. The wrappers here mirror their wire
//! shape so handler DTOs can reference them with `#[schema(value_type = ..)]`.

use utoipa::ToSchema;

/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or violates a group rule.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// No authenticated session.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested group does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The write kept losing to concurrent writers.
    #[schema(rename = "conflict")]
    Conflict,
    /// Storage is unreachable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// API error payload.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    #[schema(example = "group is full")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Structured details; group rule violations carry a `reason`.
    #[schema(example = json!({"reason": "group_full"}))]
    details: Option<serde_json::Value>,
}

/// How applications are admitted.
#[derive(ToSchema)]
#[schema(as = crate::domain::RecruitingPolicy)]
pub enum RecruitingPolicySchema {
    #[schema(rename = "AUTO")]
    Auto,
    #[schema(rename = "APPROVAL")]
    Approval,
}

/// Group lifecycle state.
#[derive(ToSchema)]
#[schema(as = crate::domain::LifecycleState)]
pub enum LifecycleStateSchema {
    #[schema(rename = "RECRUITING")]
    Recruiting,
    #[schema(rename = "START")]
    Start,
    #[schema(rename = "CLOSE")]
    Close,
}

/// Participant record status.
#[derive(ToSchema)]
#[schema(as = crate::domain::ParticipantStatus)]
pub enum ParticipantStatusSchema {
    #[schema(rename = "PENDING")]
    Pending,
    #[schema(rename = "APPROVED")]
    Approved,
    #[schema(rename = "REJECTED")]
    Rejected,
    #[schema(rename = "CANCELED")]
    Canceled,
    #[schema(rename = "LEFT")]
    Left,
    #[schema(rename = "KICKED")]
    Kicked,
}

/// Participant role.
#[derive(ToSchema)]
#[schema(as = crate::domain::ParticipantRole)]
pub enum ParticipantRoleSchema {
    #[schema(rename = "HOST")]
    Host,
    #[schema(rename = "MEMBER")]
    Member,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;

    fn schema_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[rstest]
    fn error_codes_cover_every_domain_code() {
        let json = schema_json::<ErrorCodeSchema>();

        for code in [
            "invalid_request",
            "unauthorized",
            "forbidden",
            "not_found",
            "conflict",
            "service_unavailable",
            "internal_error",
        ] {
            assert!(json.contains(code), "missing {code}");
        }
    }

    #[rstest]
    fn error_schema_uses_camel_case_trace_id() {
        let json = schema_json::<ErrorSchema>();

        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
        assert!(json.contains("traceId"));
    }

    #[rstest]
    fn enum_schemas_match_wire_casing() {
        assert!(schema_json::<RecruitingPolicySchema>().contains("APPROVAL"));
        assert!(schema_json::<LifecycleStateSchema>().contains("RECRUITING"));
        assert!(schema_json::<ParticipantStatusSchema>().contains("KICKED"));
        assert!(schema_json::<ParticipantRoleSchema>().contains("HOST"));
    }
}
