//! Public catalog read endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use store::BookstoreStore;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct BookResponse {
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub price_cents: i64,
    pub discount_percent: u8,
    pub quantity: u32,
}

/// GET /books/:id — catalog record with live stock, no auth required.
#[tracing::instrument(skip(state))]
pub async fn get<S: BookstoreStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookResponse>, ApiError> {
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid book ID: {e}")))?;

    let book = state
        .store
        .get_book(common::BookId::from_uuid(uuid))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {id} not found")))?;

    Ok(Json(BookResponse {
        id: book.id.to_string(),
        isbn: book.isbn,
        title: book.title,
        author: book.author,
        price_cents: book.price.cents(),
        discount_percent: book.discount_percent,
        quantity: book.quantity,
    }))
}
