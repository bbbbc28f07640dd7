//! Notification handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::api::ApiState;
use crate::notify::Notification;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub user_email: String,
}

/// Notification response (serializable).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub user_email: String,
    pub kind: String,
    pub request_id: String,
    pub message: String,
    pub timestamp: String,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.clone(),
            user_email: n.user_email.clone(),
            kind: n.kind.to_string(),
            request_id: n.request_id.clone(),
            message: n.message.clone(),
            timestamp: n.timestamp.to_rfc3339(),
        }
    }
}

/// GET /notifications?userEmail=
pub async fn list_notifications(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let Query(query) = query?;
    let notifications = state.notifications.list_for(&query.user_email)?;
    Ok(Json(
        notifications.iter().map(NotificationResponse::from).collect(),
    ))
}
