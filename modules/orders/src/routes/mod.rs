//! HTTP surface of the orders service
//!
//! The order endpoints sit behind the audit-capture middleware so every
//! request lands in the audit pipeline; the health endpoint stays outside it.

pub mod audit_capture;
pub mod orders;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;

use crate::pipeline::AuditPipeline;
use crate::services::OrderService;

/// Shared state handed to handlers and the audit middleware
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
    pub pipeline: Arc<AuditPipeline>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let orders_api = Router::new()
        .route(
            "/api/orders",
            post(orders::create_order).get(orders::list_orders),
        )
        .route(
            "/api/orders/{order_id}",
            get(orders::get_order).delete(orders::return_order),
        )
        .route("/api/orders/{order_id}/complete", post(orders::complete_order))
        .route("/api/orders/{order_id}/refund", post(orders::refund_order))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            audit_capture::audit_capture,
        ))
        .with_state(state);

    Router::new()
        .route("/api/health", get(health))
        .merge(orders_api)
}

/// Health check endpoint handler
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "orders-rs",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
