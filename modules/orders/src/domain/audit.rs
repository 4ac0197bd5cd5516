use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::order::OrderStatus;

/// Snapshot of one handled HTTP request, captured by the audit middleware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestAuditRecord {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    /// Raw request body; JSON `null` when the request had no body
    pub request_body: serde_json::Value,
    pub query_params: HashMap<String, String>,
    pub status_code: u16,
    /// Raw response body; JSON `null` when the response had no body
    pub response_body: serde_json::Value,
}

/// One order status transition, emitted by the order service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRecord {
    pub order_id: i64,
    pub previous_status: OrderStatus,
    pub current_status: OrderStatus,
}

/// A unit of work flowing through the audit pipeline
///
/// The pipeline stages match on this exhaustively; adding a variant is a
/// compile-time change to every sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuditEvent {
    Request(RequestAuditRecord),
    StatusChange(StatusChangeRecord),
}
