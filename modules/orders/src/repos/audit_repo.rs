use sqlx::PgPool;

use crate::domain::{RequestAuditRecord, StatusChangeRecord};

/// Insert one request audit row, returning the generated entry id
pub async fn insert_request_audit(
    db: &PgPool,
    record: &RequestAuditRecord,
) -> Result<i64, sqlx::Error> {
    let headers = serde_json::to_value(&record.headers)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    let query_params = serde_json::to_value(&record.query_params)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let (entry_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO audit_logs (
            method, path,
            request_header, request_body, query_params,
            status_code, response_body
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7
        )
        RETURNING entry_id
        "#,
    )
    .bind(&record.method)
    .bind(&record.path)
    .bind(headers)
    .bind(&record.request_body)
    .bind(query_params)
    .bind(i32::from(record.status_code))
    .bind(&record.response_body)
    .fetch_one(db)
    .await?;

    Ok(entry_id)
}

/// Insert one status transition row, returning the generated entry id
pub async fn insert_status_audit(
    db: &PgPool,
    record: &StatusChangeRecord,
) -> Result<i64, sqlx::Error> {
    let (entry_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO order_status_audit (
            order_id, previous_status, current_status
        ) VALUES (
            $1, $2, $3
        )
        RETURNING entry_id
        "#,
    )
    .bind(record.order_id)
    .bind(record.previous_status.as_str())
    .bind(record.current_status.as_str())
    .fetch_one(db)
    .await?;

    Ok(entry_id)
}
