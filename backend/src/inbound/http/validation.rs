//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every failure is an `invalid_request` error whose details name the
//! offending field, the rejected value and a stable code.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{DisplayName, Error, LifecycleState, RecruitingPolicy, StudyGroupId, UserId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
    InvalidEnum,
    InvalidDisplayName,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidEnum => "invalid_enum",
            ErrorCode::InvalidDisplayName => "invalid_display_name",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: Option<&str>) -> Error {
    let details = match value {
        Some(value) => json!({ "field": field.as_str(), "value": value, "code": code.as_str() }),
        None => json!({ "field": field.as_str(), "code": code.as_str() }),
    };
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    field_error(
        field,
        format!("missing required field: {}", field.as_str()),
        ErrorCode::MissingField,
        None,
    )
}

pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

pub(crate) fn parse_group_id(value: &str, field: FieldName) -> Result<StudyGroupId, Error> {
    StudyGroupId::from_str(value).map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            Some(value),
        )
    })
}

pub(crate) fn parse_user_id(value: &str, field: FieldName) -> Result<UserId, Error> {
    UserId::new(value).map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            Some(value),
        )
    })
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| {
            field_error(
                field,
                format!("{} must be an RFC 3339 timestamp", field.as_str()),
                ErrorCode::InvalidTimestamp,
                Some(value),
            )
        })
}

pub(crate) fn parse_policy(value: &str, field: FieldName) -> Result<RecruitingPolicy, Error> {
    RecruitingPolicy::from_str(value).map_err(|_| {
        field_error(
            field,
            format!("{} must be one of: AUTO, APPROVAL", field.as_str()),
            ErrorCode::InvalidEnum,
            Some(value),
        )
    })
}

pub(crate) fn parse_state(value: &str, field: FieldName) -> Result<LifecycleState, Error> {
    LifecycleState::from_str(value).map_err(|_| {
        field_error(
            field,
            format!("{} must be one of: RECRUITING, START, CLOSE", field.as_str()),
            ErrorCode::InvalidEnum,
            Some(value),
        )
    })
}

pub(crate) fn parse_display_name(value: &str, field: FieldName) -> Result<DisplayName, Error> {
    DisplayName::new(value).map_err(|error| {
        field_error(
            field,
            format!("{}: {error}", field.as_str()),
            ErrorCode::InvalidDisplayName,
            Some(value),
        )
    })
}
