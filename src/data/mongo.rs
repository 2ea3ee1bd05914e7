//! MongoDB-backed store
//!
//! Collections:
//! - `users` {_id, email}, unique index on `email`
//! - `activity_logs` {user_id, type, timestamp}

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};

use super::models::{ActivityLog, ActivityType, EntityId, User, UserResolution};
use super::store::Store;
use crate::config::DatabaseConfig;
use crate::error::AppError;

const USERS: &str = "users";
const ACTIVITY_LOGS: &str = "activity_logs";

/// MongoDB store
///
/// The client pools connections internally and is shared by every request.
#[derive(Debug, Clone)]
pub struct MongoStore {
    users: Collection<User>,
    activity_logs: Collection<ActivityLog>,
}

impl MongoStore {
    /// Connect and make sure the `email` index exists
    ///
    /// # Errors
    /// Returns error if the server is unreachable or index creation fails
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let client = Client::with_uri_str(config.uri()).await?;
        let db = client.database(&config.name);

        let store = Self {
            users: db.collection(USERS),
            activity_logs: db.collection(ACTIVITY_LOGS),
        };
        store.ensure_indexes().await?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            "MongoDB store connected"
        );

        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(unique_email).await?;

        let by_user = IndexModel::builder()
            .keys(doc! { "user_id": 1, "timestamp": -1 })
            .build();
        self.activity_logs.create_index(by_user).await?;

        Ok(())
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn find_or_create_user(&self, email: &str) -> Result<UserResolution, AppError> {
        let new_id = EntityId::new().0;

        // Upsert keyed on email; `_id` is only written when the document is
        // inserted, so the pre-image tells us whether this call created it.
        let upserted = self
            .users
            .find_one_and_update(
                doc! { "email": email },
                doc! { "$setOnInsert": { "_id": new_id.as_str() } },
            )
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .await;

        let previous = match upserted {
            Ok(previous) => previous,
            // A concurrent upsert inserted this email first
            Err(error) if is_duplicate_key(&error) => {
                let existing = self.users.find_one(doc! { "email": email }).await?;
                Some(existing.ok_or_else(|| {
                    anyhow::anyhow!("user {email} vanished after duplicate key error")
                })?)
            }
            Err(error) => return Err(error.into()),
        };

        Ok(match previous {
            Some(user) => UserResolution {
                user,
                activity_type: ActivityType::Login,
            },
            None => UserResolution {
                user: User {
                    id: new_id,
                    email: email.to_string(),
                },
                activity_type: ActivityType::Signup,
            },
        })
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn append_activity(&self, entry: &ActivityLog) -> Result<(), AppError> {
        self.activity_logs.insert_one(entry).await?;
        Ok(())
    }

    async fn list_activity(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ActivityLog>, AppError> {
        use futures::TryStreamExt;

        let cursor = self
            .activity_logs
            .find(doc! { "user_id": user_id })
            .sort(doc! { "timestamp": -1 })
            .limit(limit as i64)
            .await?;

        Ok(cursor.try_collect().await?)
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match error.kind.as_ref() {
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY,
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY,
        _ => false,
    }
}
