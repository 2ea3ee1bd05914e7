//! In-memory store
//!
//! Volatile; cleared on restart. Used for local development
//! (`database.backend = "memory"`) and tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{ActivityLog, ActivityType, EntityId, User, UserResolution};
use super::store::Store;
use crate::error::AppError;

#[derive(Debug, Default)]
struct Collections {
    users: Vec<User>,
    activity_logs: Vec<ActivityLog>,
}

/// In-memory store
///
/// Find-or-create runs under the write lock, so it is atomic with respect
/// to other callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all users (for debugging/testing)
    pub async fn users(&self) -> Vec<User> {
        self.inner.read().await.users.clone()
    }

    /// Snapshot of all activity log entries in insertion order
    pub async fn activity_logs(&self) -> Vec<ActivityLog> {
        self.inner.read().await.activity_logs.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_or_create_user(&self, email: &str) -> Result<UserResolution, AppError> {
        let mut inner = self.inner.write().await;

        if let Some(user) = inner.users.iter().find(|user| user.email == email) {
            return Ok(UserResolution {
                user: user.clone(),
                activity_type: ActivityType::Login,
            });
        }

        let user = User {
            id: EntityId::new().0,
            email: email.to_string(),
        };
        inner.users.push(user.clone());

        Ok(UserResolution {
            user,
            activity_type: ActivityType::Signup,
        })
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|user| user.id == id).cloned())
    }

    async fn append_activity(&self, entry: &ActivityLog) -> Result<(), AppError> {
        self.inner.write().await.activity_logs.push(entry.clone());
        Ok(())
    }

    async fn list_activity(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ActivityLog>, AppError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<ActivityLog> = inner
            .activity_logs
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps; reverse it
        // first so later inserts come out ahead.
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}
