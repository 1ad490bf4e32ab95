//! Order placement, cancellation, and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use checkout::{CancelOrder, CheckoutService, PlaceOrder, RequestedItem};
use common::{BookId, OrderId, UserId};
use domain::{Order, PaymentMethod, ShippingAddress};
use serde::{Deserialize, Serialize};
use store::BookstoreStore;

use crate::cache::BookRefCache;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: BookstoreStore> {
    pub checkout: CheckoutService<S>,
    pub store: S,
    pub book_refs: BookRefCache,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// One requested item, referencing a book by id or by ISBN.
#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub book_id: Option<String>,
    pub isbn: Option<String>,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct PlacedOrderResponse {
    pub success: bool,
    pub order: PlacedOrderSummary,
}

#[derive(Serialize)]
pub struct PlacedOrderSummary {
    pub order_id: String,
    pub total_price_cents: i64,
    pub status: String,
}

#[derive(Serialize)]
pub struct CancelledOrderResponse {
    pub success: bool,
    pub order: CancelledOrderSummary,
}

#[derive(Serialize)]
pub struct CancelledOrderSummary {
    pub order_id: String,
    pub status: String,
}

/// The full order document.
#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderLineResponse>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub subtotal_cents: i64,
    pub shipping_price_cents: i64,
    pub tax_price_cents: i64,
    pub total_price_cents: i64,
    pub is_paid: bool,
    pub paid_at: Option<String>,
    pub is_delivered: bool,
    pub delivered_at: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub book_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub discount_percent: u8,
    pub line_total_cents: i64,
}

impl OrderResponse {
    fn from_order(order: Order) -> Self {
        let items = order
            .items
            .iter()
            .map(|line| OrderLineResponse {
                book_id: line.book_id.to_string(),
                title: line.title.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                discount_percent: line.discount_percent,
                line_total_cents: line.line_total().cents(),
            })
            .collect();

        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.to_string(),
            items,
            subtotal_cents: order.subtotal().cents(),
            shipping_address: order.shipping_address,
            payment_method: order.payment_method.to_string(),
            shipping_price_cents: order.shipping_price.cents(),
            tax_price_cents: order.tax_price.cents(),
            total_price_cents: order.total_price.cents(),
            is_paid: order.is_paid,
            paid_at: order.paid_at.map(|t| t.to_rfc3339()),
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at.map(|t| t.to_rfc3339()),
            tracking_number: order.tracking_number,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — place an order for the authenticated user.
#[tracing::instrument(skip(state, headers, payload))]
pub async fn create<S: BookstoreStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<PlacedOrderResponse>), ApiError> {
    let user_id = authenticate(&headers)?;
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut items = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let book_id = resolve_book_ref(&state, item).await?;
        items.push(RequestedItem::new(book_id, item.quantity));
    }

    let cmd = PlaceOrder::new(user_id, items, req.shipping_address, req.payment_method);
    let order = state.checkout.place_order(cmd).await?;

    let response = PlacedOrderResponse {
        success: true,
        order: PlacedOrderSummary {
            order_id: order.id.to_string(),
            total_price_cents: order.total_price.cents(),
            status: order.status.to_string(),
        },
    };

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// PUT /orders/:id/cancel — cancel an order as its owner or an admin.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel<S: BookstoreStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CancelledOrderResponse>, ApiError> {
    let user_id = authenticate(&headers)?;
    let order_id = parse_order_id(&id)?;

    let order = state
        .checkout
        .cancel_order(CancelOrder::new(order_id, user_id))
        .await?;

    Ok(Json(CancelledOrderResponse {
        success: true,
        order: CancelledOrderSummary {
            order_id: order.id.to_string(),
            status: order.status.to_string(),
        },
    }))
}

/// GET /orders/:id — full order document, for the owner or an admin.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: BookstoreStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = authenticate(&headers)?;
    let order_id = parse_order_id(&id)?;

    let order = state
        .checkout
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    let requester = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(format!("Unknown user {user_id}")))?;
    if !requester.can_act_for(order.user_id) {
        return Err(checkout::CheckoutError::NotAuthorized { user_id, order_id }.into());
    }

    Ok(Json(OrderResponse::from_order(order)))
}

async fn resolve_book_ref<S: BookstoreStore>(
    state: &AppState<S>,
    item: &OrderItemRequest,
) -> Result<BookId, ApiError> {
    match (&item.book_id, &item.isbn) {
        (Some(id), _) => {
            let uuid = uuid::Uuid::parse_str(id)
                .map_err(|e| ApiError::BadRequest(format!("Invalid book_id: {e}")))?;
            Ok(BookId::from_uuid(uuid))
        }
        (None, Some(isbn)) => state
            .book_refs
            .resolve(&state.store, isbn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No book with ISBN {isbn}"))),
        (None, None) => Err(ApiError::BadRequest(
            "Each item needs a book_id or an isbn".to_string(),
        )),
    }
}

fn authenticate(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get("x-user-id")
        .ok_or_else(|| ApiError::Unauthorized("Missing x-user-id header".to_string()))?;
    let text = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid x-user-id header".to_string()))?;
    let uuid = uuid::Uuid::parse_str(text)
        .map_err(|e| ApiError::Unauthorized(format!("Invalid x-user-id header: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
