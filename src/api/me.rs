//! Current user endpoint

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{ActivityLog, ActivityType};
use crate::error::AppError;

/// Activity entries returned per request
const ACTIVITY_LIMIT: usize = 20;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub activity: Vec<ActivityResponse>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
}

impl From<ActivityLog> for ActivityResponse {
    fn from(entry: ActivityLog) -> Self {
        Self {
            activity_type: entry.activity_type,
            timestamp: entry.timestamp,
        }
    }
}

/// Create router for the authenticated API
pub fn me_router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// GET /api/me
///
/// Returns the user behind the bearer JWT with their recent activity.
async fn me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or(AppError::NotFound)?;
    let activity = state.store.list_activity(&user.id, ACTIVITY_LIMIT).await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        activity: activity.into_iter().map(Into::into).collect(),
    }))
}
