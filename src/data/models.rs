//! Data models
//!
//! Rust structs representing stored documents.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A user identified by the email a provider vouched for
///
/// Stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
}

// =============================================================================
// Activity Log
// =============================================================================

/// Kind of successful sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    /// First sign-in for this email; the user record was created
    Signup,
    /// Sign-in for an existing user
    Login,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Login => "login",
        }
    }
}

/// Append-only record, one per successful callback
///
/// Stored in the `activity_logs` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub user_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl ActivityLog {
    /// New entry stamped with the current UTC time
    pub fn now(user_id: impl Into<String>, activity_type: ActivityType) -> Self {
        Self {
            user_id: user_id.into(),
            activity_type,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of find-or-create by email
#[derive(Debug, Clone)]
pub struct UserResolution {
    pub user: User,
    /// `Signup` when this call created the user, `Login` otherwise
    pub activity_type: ActivityType,
}
