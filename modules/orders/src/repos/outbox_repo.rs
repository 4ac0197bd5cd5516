use sqlx::{FromRow, PgPool};

use crate::domain::{OutboxTask, TaskType, MAX_ATTEMPTS, RETRY_BACKOFF_SECS};

#[derive(Debug, FromRow)]
struct OutboxTaskRow {
    task_id: i64,
    task_status: String,
    task_type: String,
    entry_id: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    attempts_count: i32,
    next_attempt_at: chrono::DateTime<chrono::Utc>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl OutboxTaskRow {
    fn into_task(self) -> Result<OutboxTask, sqlx::Error> {
        let task_status = self
            .task_status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        let task_type = self
            .task_type
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(OutboxTask {
            task_id: self.task_id,
            task_status,
            task_type,
            entry_id: self.entry_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            attempts_count: self.attempts_count,
            next_attempt_at: self.next_attempt_at,
            finished_at: self.finished_at,
        })
    }
}

/// Enqueue a delivery task for a persisted audit entry
///
/// Runs against the same pool as the audit insert; the dispatcher picks the
/// task up on its next cycle.
pub async fn create_task(
    db: &PgPool,
    entry_id: i64,
    task_type: TaskType,
) -> Result<i64, sqlx::Error> {
    let (task_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO outbox (entry_id, task_type, task_status)
        VALUES ($1, $2, 'CREATED')
        RETURNING task_id
        "#,
    )
    .bind(entry_id)
    .bind(task_type.as_str())
    .fetch_one(db)
    .await?;

    tracing::debug!(task_id = %task_id, entry_id = %entry_id, "Outbox task enqueued");

    Ok(task_id)
}

/// Atomically lease up to `limit` ready tasks
///
/// Ready means CREATED or FAILED, under the attempt limit, with
/// next_attempt_at due. Leased rows move to PROCESSING in the same
/// statement; `FOR UPDATE SKIP LOCKED` keeps concurrent dispatchers from
/// leasing the same rows.
pub async fn lease_ready(db: &PgPool, limit: i64) -> Result<Vec<OutboxTask>, sqlx::Error> {
    let rows: Vec<OutboxTaskRow> = sqlx::query_as(
        r#"
        WITH cte AS (
            SELECT task_id
              FROM outbox
             WHERE (task_status = 'CREATED' OR task_status = 'FAILED')
               AND attempts_count < $2
               AND next_attempt_at <= NOW()
             ORDER BY created_at
             LIMIT $1
             FOR UPDATE SKIP LOCKED
        )
        UPDATE outbox
           SET task_status = 'PROCESSING',
               updated_at  = NOW()
         WHERE task_id IN (SELECT task_id FROM cte)
        RETURNING task_id, task_status, task_type, entry_id,
                  created_at, updated_at, attempts_count, next_attempt_at, finished_at
        "#,
    )
    .bind(limit)
    .bind(MAX_ATTEMPTS)
    .fetch_all(db)
    .await?;

    rows.into_iter().map(OutboxTaskRow::into_task).collect()
}

/// Delete tasks whose payload was published
///
/// Ids that no longer exist are skipped, so reconciling an already-deleted
/// set is a no-op.
pub async fn delete_completed(db: &PgPool, task_ids: &[i64]) -> Result<u64, sqlx::Error> {
    if task_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query("DELETE FROM outbox WHERE task_id = ANY($1)")
        .bind(task_ids)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

/// Record a failed attempt for each task in one statement
///
/// Below the attempt limit the task returns to FAILED with a fixed backoff;
/// at the limit it becomes NO_ATTEMPTS_LEFT and finished_at is stamped. The
/// CASE expressions keep the whole transition atomic per row.
pub async fn mark_failed(db: &PgPool, task_ids: &[i64]) -> Result<u64, sqlx::Error> {
    if task_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        UPDATE outbox
           SET attempts_count = attempts_count + 1,
               task_status = CASE
                 WHEN attempts_count + 1 >= $2 THEN 'NO_ATTEMPTS_LEFT'
                 ELSE 'FAILED'
               END,
               next_attempt_at = CASE
                 WHEN attempts_count + 1 < $2 THEN NOW() + make_interval(secs => $3)
                 ELSE next_attempt_at
               END,
               finished_at = CASE
                 WHEN attempts_count + 1 >= $2 THEN NOW()
                 ELSE finished_at
               END,
               updated_at = NOW()
         WHERE task_id = ANY($1)
        "#,
    )
    .bind(task_ids)
    .bind(MAX_ATTEMPTS)
    .bind(RETRY_BACKOFF_SECS as f64)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}

/// Return PROCESSING tasks whose lease is older than `older_than_secs`
/// back to CREATED without charging an attempt
pub async fn release_stale(db: &PgPool, older_than_secs: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE outbox
           SET task_status = 'CREATED',
               updated_at  = NOW()
         WHERE task_status = 'PROCESSING'
           AND updated_at <= NOW() - make_interval(secs => $1)
        "#,
    )
    .bind(older_than_secs as f64)
    .execute(db)
    .await?;

    Ok(result.rows_affected())
}
