//! MongoDB store tests
//!
//! Need a running server: set `LOGINBRIDGE_TEST_MONGO_URI` (for example
//! `mongodb://localhost:27017`). Skipped when unset.

use std::sync::Arc;

use super::*;
use crate::config::{DatabaseConfig, StoreBackend};

/// Connect to a fresh, uniquely named database
async fn create_test_store() -> Option<(MongoStore, mongodb::Database)> {
    let Ok(uri) = std::env::var("LOGINBRIDGE_TEST_MONGO_URI") else {
        eprintln!("LOGINBRIDGE_TEST_MONGO_URI not set; skipping MongoDB test");
        return None;
    };
    let url = url::Url::parse(&uri).unwrap();
    let config = DatabaseConfig {
        backend: StoreBackend::Mongodb,
        host: url.host_str().unwrap_or("localhost").to_string(),
        port: url.port().unwrap_or(27017),
        name: format!("loginbridge-test-{}", EntityId::new().0.to_lowercase()),
    };

    let store = MongoStore::connect(&config).await.unwrap();
    let client = mongodb::Client::with_uri_str(config.uri()).await.unwrap();
    Some((store, client.database(&config.name)))
}

#[tokio::test]
async fn test_find_or_create_classifies_signup_then_login() {
    let Some((store, db)) = create_test_store().await else {
        return;
    };

    let first = store.find_or_create_user("a@example.com").await.unwrap();
    assert_eq!(first.activity_type, ActivityType::Signup);
    assert_eq!(first.user.email, "a@example.com");

    let second = store.find_or_create_user("a@example.com").await.unwrap();
    assert_eq!(second.activity_type, ActivityType::Login);
    assert_eq!(second.user.id, first.user.id);

    let other = store.find_or_create_user("b@example.com").await.unwrap();
    assert_eq!(other.activity_type, ActivityType::Signup);
    assert_ne!(other.user.id, first.user.id);

    let stored = store.get_user(&first.user.id).await.unwrap().unwrap();
    assert_eq!(stored, first.user);

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_first_logins_sign_up_once() {
    let Some((store, db)) = create_test_store().await else {
        return;
    };
    let store = Arc::new(store);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.find_or_create_user("race@example.com").await })
        })
        .collect();

    let mut resolutions = Vec::new();
    for task in tasks {
        resolutions.push(task.await.unwrap().unwrap());
    }

    let signups = resolutions
        .iter()
        .filter(|r| r.activity_type == ActivityType::Signup)
        .count();
    assert_eq!(signups, 1);
    let id = &resolutions[0].user.id;
    assert!(resolutions.iter().all(|r| &r.user.id == id));

    db.drop().await.unwrap();
}

#[tokio::test]
async fn test_activity_is_listed_most_recent_first() {
    let Some((store, db)) = create_test_store().await else {
        return;
    };

    let user = store.find_or_create_user("a@example.com").await.unwrap().user;
    let mut signup = ActivityLog::now(user.id.clone(), ActivityType::Signup);
    signup.timestamp -= chrono::Duration::seconds(60);
    store.append_activity(&signup).await.unwrap();
    store
        .append_activity(&ActivityLog::now(user.id.clone(), ActivityType::Login))
        .await
        .unwrap();
    store
        .append_activity(&ActivityLog::now("someone-else", ActivityType::Login))
        .await
        .unwrap();

    let entries = store.list_activity(&user.id, 10).await.unwrap();
    let types: Vec<_> = entries.iter().map(|e| e.activity_type).collect();
    assert_eq!(types, vec![ActivityType::Login, ActivityType::Signup]);

    let limited = store.list_activity(&user.id, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].activity_type, ActivityType::Login);

    db.drop().await.unwrap();
}
