//! Order API Routes
//!
//! HTTP endpoints for the order lifecycle: create, complete, refund,
//! return-to-courier, and the read queries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Order, OrderError, OrderStatus, Packaging};
use crate::repos::order_repo::OrderFilter;
use crate::services::NewOrder;

use super::AppState;

/// Request body for POST /api/orders
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order_id: i64,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub weight: i32,
    pub cost: i32,
    pub packaging: Option<Packaging>,
    #[serde(default)]
    pub additional_film: bool,
}

/// Request body for POST /api/orders/{order_id}/complete
#[derive(Debug, Deserialize)]
pub struct CompleteOrderRequest {
    pub user_id: i64,
}

/// Query parameters for GET /api/orders
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
    pub last_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrdersListResponse {
    pub orders: Vec<Order>,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error wrapper mapping domain failures to HTTP status codes
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        let status = match e {
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::NotOwnedByUser(_, _) => StatusCode::FORBIDDEN,
            OrderError::AlreadyCompleted(_)
            | OrderError::NotCompleted(_)
            | OrderError::RefundWindowClosed(_)
            | OrderError::ExpirationInFuture => StatusCode::CONFLICT,
            OrderError::ExpirationInPast
            | OrderError::WeightExceedsPackaging
            | OrderError::UnknownPackaging(_)
            | OrderError::UnknownStatus(_)
            | OrderError::InvalidFields => StatusCode::BAD_REQUEST,
            OrderError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %e, "order request failed");
        }

        ApiError {
            status,
            message: e.to_string(),
        }
    }
}

/// Handler for POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .service
        .create_order(NewOrder {
            order_id: req.order_id,
            user_id: req.user_id,
            expires_at: req.expires_at,
            weight: req.weight,
            cost: req.cost,
            packaging: req.packaging,
            additional_film: req.additional_film,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Handler for GET /api/orders
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, ApiError> {
    let order = state.service.get_order(order_id).await?;

    Ok(Json(order))
}

/// Handler for GET /api/orders with pagination and filters
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListOrdersQuery>,
) -> Result<Json<OrdersListResponse>, ApiError> {
    let filter = OrderFilter {
        user_id: params.user_id,
        status: params.status,
    };

    let orders = state
        .service
        .list_orders(filter, params.last_id, params.limit)
        .await?;

    Ok(Json(OrdersListResponse { orders }))
}

/// Handler for POST /api/orders/{order_id}/complete
pub async fn complete_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<CompleteOrderRequest>,
) -> Result<StatusCode, ApiError> {
    state.service.complete_order(order_id, req.user_id).await?;

    Ok(StatusCode::OK)
}

/// Handler for POST /api/orders/{order_id}/refund
pub async fn refund_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.refund_order(order_id).await?;

    Ok(StatusCode::OK)
}

/// Handler for DELETE /api/orders/{order_id}
pub async fn return_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.return_order(order_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
