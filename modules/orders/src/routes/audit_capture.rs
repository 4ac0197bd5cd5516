//! Request audit middleware
//!
//! Buffers the request and response bodies of every order endpoint, builds a
//! [`RequestAuditRecord`], and hands it to the audit pipeline. Submission is
//! fire-and-forget; an overloaded pipeline never affects the HTTP response.

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::{AuditEvent, RequestAuditRecord};

use super::AppState;

pub async fn audit_capture(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();

    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();
    let headers = header_values(&parts.headers);
    let query_params = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(params)| params)
        .unwrap_or_default();

    let request_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let req = Request::from_parts(parts, Body::from(request_bytes.clone()));
    let response = next.run(req).await;

    let (parts, body) = response.into_parts();
    let status_code = parts.status.as_u16();
    let response_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    state.pipeline.submit(AuditEvent::Request(RequestAuditRecord {
        method,
        path,
        headers,
        request_body: body_to_value(&request_bytes),
        query_params,
        status_code,
        response_body: body_to_value(&response_bytes),
    }));

    Response::from_parts(parts, Body::from(response_bytes))
}

fn header_values(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Empty bodies become JSON null; non-JSON bodies are kept as a string
fn body_to_value(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }

    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
