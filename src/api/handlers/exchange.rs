//! Exchange request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::api::ApiState;
use crate::book::OfferedBook;
use crate::request::{Decision, ExchangeRequest};

/// Offered book snapshot as sent by the client.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfferedBookBody {
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub condition: String,
    pub image_url: Option<String>,
}

/// Body of `POST /exchange/request`.
///
/// Missing fields deserialize as empty so they surface as validation errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateExchangeRequest {
    pub requester_email: String,
    pub target_book_id: String,
    pub offered_book: OfferedBookBody,
}

/// Exchange request response (serializable).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequestResponse {
    pub id: String,
    pub requester_email: String,
    pub target_book_id: String,
    pub target_book_title: String,
    /// Absent on older records routed through the catalog.
    pub target_owner_email: Option<String>,
    pub offered_book: OfferedBookBody,
    pub status: String,
    pub created_at: String,
    pub decided_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_email: String,
    /// Received requests when true, sent requests otherwise.
    #[serde(default = "default_as_target")]
    pub as_target: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

fn default_as_target() -> bool {
    true
}

impl From<OfferedBookBody> for OfferedBook {
    fn from(body: OfferedBookBody) -> Self {
        OfferedBook {
            book_id: body.book_id,
            title: body.title,
            author: body.author,
            isbn: body.isbn,
            condition: body.condition,
            image_url: body.image_url,
        }
    }
}

impl From<&OfferedBook> for OfferedBookBody {
    fn from(book: &OfferedBook) -> Self {
        OfferedBookBody {
            book_id: book.book_id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            condition: book.condition.clone(),
            image_url: book.image_url.clone(),
        }
    }
}

impl From<&ExchangeRequest> for ExchangeRequestResponse {
    fn from(request: &ExchangeRequest) -> Self {
        Self {
            id: request.id.clone(),
            requester_email: request.requester_email.clone(),
            target_book_id: request.target_book_id.clone(),
            target_book_title: request.target_book_title.clone(),
            target_owner_email: request.target_owner.email().map(str::to_string),
            offered_book: OfferedBookBody::from(&request.offered_book),
            status: request.status.to_string(),
            created_at: request.created_at.to_rfc3339(),
            decided_at: request.decided_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Propose an exchange.
///
/// POST /exchange/request
pub async fn create_request(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CreateExchangeRequest>, JsonRejection>,
) -> Result<Json<ExchangeRequestResponse>, ApiError> {
    let Json(body) = payload?;
    let request = state.service.create_request(
        &body.requester_email,
        &body.target_book_id,
        body.offered_book.into(),
    )?;
    Ok(Json(ExchangeRequestResponse::from(&request)))
}

/// List sent or received requests for a user.
///
/// GET /exchange/requests?userEmail=&asTarget=
pub async fn list_requests(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ExchangeRequestResponse>>, ApiError> {
    let Query(query) = query?;
    let requests = if query.as_target {
        state.service.list_received(&query.user_email)?
    } else {
        state.service.list_sent(&query.user_email)?
    };
    Ok(Json(requests.iter().map(ExchangeRequestResponse::from).collect()))
}

/// GET /exchange/:id
pub async fn get_request(
    State(state): State<Arc<ApiState>>,
    Path(request_id): Path<String>,
) -> Result<Json<ExchangeRequestResponse>, ApiError> {
    let request = state.service.get_request(&request_id)?;
    Ok(Json(ExchangeRequestResponse::from(&request)))
}

/// Accept or reject a pending request.
///
/// POST /exchange/:id/status?status=accepted|rejected
pub async fn update_status(
    State(state): State<Arc<ApiState>>,
    Path(request_id): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<ExchangeRequestResponse>, ApiError> {
    let Query(query) = query?;
    let decision: Decision = query.status.parse()?;
    let request = state.service.decide(&request_id, decision)?;
    Ok(Json(ExchangeRequestResponse::from(&request)))
}
