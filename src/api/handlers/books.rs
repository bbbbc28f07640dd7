//! Catalog handlers.
//!
//! Just enough to seed and inspect the catalog the workflow reads from.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiError;
use crate::api::ApiState;
use crate::book::BookRecord;
use crate::catalog::BookCatalog;
use crate::error::ExchangeError;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBody {
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub owner_email: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Book response (serializable).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub book_id: String,
    #[serde(flatten)]
    pub book: BookBody,
}

fn default_quantity() -> u32 {
    1
}

impl From<BookRecord> for BookResponse {
    fn from(record: BookRecord) -> Self {
        Self {
            book_id: record.book_id,
            book: BookBody {
                name: record.name,
                author: record.author,
                condition: record.condition,
                image_url: record.image_url,
                owner_email: record.owner_email,
                quantity: record.quantity,
            },
        }
    }
}

/// PUT /books/:id
pub async fn put_book(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
    payload: Result<Json<BookBody>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let Json(body) = payload?;
    if body.owner_email.trim().is_empty() || body.name.trim().is_empty() {
        return Err(ExchangeError::Validation("book name and owner email are required".into()).into());
    }
    let record = BookRecord {
        book_id: book_id.clone(),
        name: body.name,
        author: body.author,
        condition: body.condition,
        image_url: body.image_url,
        owner_email: body.owner_email,
        quantity: body.quantity,
    };
    state.catalog.put(&record)?;
    info!(book_id = %book_id, owner = %record.owner_email, "Book stored");
    Ok(Json(BookResponse::from(record)))
}

/// GET /books/:id
pub async fn get_book(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let record = state
        .catalog
        .get(&book_id)?
        .ok_or_else(|| ExchangeError::book_not_found(&book_id))?;
    Ok(Json(BookResponse::from(record)))
}

/// DELETE /books/:id
pub async fn delete_book(
    State(state): State<Arc<ApiState>>,
    Path(book_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.catalog.remove(&book_id)? {
        Some(_) => {
            info!(book_id = %book_id, "Book removed");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ExchangeError::book_not_found(&book_id).into()),
    }
}
