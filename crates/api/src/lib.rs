//! HTTP API server for the bookstore order system.
//!
//! Provides REST endpoints for order placement, cancellation, and
//! catalog reads, with structured logging (tracing) and Prometheus
//! metrics.

pub mod cache;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::CheckoutService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::BookstoreStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use cache::BookRefCache;
pub use config::Config;
pub use error::ApiError;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: BookstoreStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        .route("/books/{id}", get(routes::books::get::<S>))
        .with_state(state)
        .merge(routes::metrics::router(metrics_handle))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the shared application state: the checkout service wired
/// with the configured pricing and retry policy, the store handle for
/// direct reads, and the ISBN resolution cache.
pub fn create_state<S: BookstoreStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let checkout = CheckoutService::new(store.clone())
        .with_pricing(config.pricing_engine())
        .with_retry_policy(config.retry_policy());

    Arc::new(AppState {
        checkout,
        store,
        book_refs: BookRefCache::default(),
    })
}
