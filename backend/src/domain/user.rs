//! User identity primitives.
//!
//! Credentials and profiles live in an external identity service; this
//! backend only needs a stable identifier and the nickname a user presents
//! in group channels.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum allowed length for a display name.
pub const DISPLAY_NAME_MIN: usize = 3;
/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 32;

/// Validation errors returned by the user primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("user id must not be empty")]
    EmptyId,
    #[error("user id must be a valid UUID")]
    InvalidId,
    #[error("display name must not be empty")]
    EmptyDisplayName,
    #[error("display name must be at least {min} characters")]
    DisplayNameTooShort { min: usize },
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },
    #[error("display name may only contain letters, numbers, spaces, or underscores")]
    DisplayNameInvalidCharacters,
}

/// Stable user identifier stored as a UUID.
///
/// Ordering follows the UUID so participant collections iterate
/// deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if raw.trim() != raw {
            return Err(UserValidationError::InvalidId);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a UUID read from storage.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Nickname shown to other members of a group channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

fn is_display_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ' '
}

impl DisplayName {
    /// Validate and construct a [`DisplayName`].
    pub fn new(display_name: impl Into<String>) -> Result<Self, UserValidationError> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }

        let length = display_name.chars().count();
        if length < DISPLAY_NAME_MIN {
            return Err(UserValidationError::DisplayNameTooShort {
                min: DISPLAY_NAME_MIN,
            });
        }
        if length > DISPLAY_NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        if !display_name.chars().all(is_display_name_char) {
            return Err(UserValidationError::DisplayNameInvalidCharacters);
        }

        Ok(Self(display_name))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
