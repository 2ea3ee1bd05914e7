//! Store abstraction over users and activity logs

use async_trait::async_trait;

use super::models::{ActivityLog, User, UserResolution};
use crate::error::AppError;

/// Persistence for users and their sign-in activity
///
/// Implemented by [`super::MongoStore`] for production and
/// [`super::MemoryStore`] for development and tests.
#[async_trait]
pub trait Store: Send + Sync {
    /// Find the user with this email, creating it when absent.
    ///
    /// Must be atomic: concurrent calls for the same email create at most
    /// one user, and exactly one of them reports `Signup`.
    async fn find_or_create_user(&self, email: &str) -> Result<UserResolution, AppError>;

    /// Get a user by ID
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Append an activity log entry
    async fn append_activity(&self, entry: &ActivityLog) -> Result<(), AppError>;

    /// Activity for a user, most recent first
    async fn list_activity(&self, user_id: &str, limit: usize)
    -> Result<Vec<ActivityLog>, AppError>;
}
