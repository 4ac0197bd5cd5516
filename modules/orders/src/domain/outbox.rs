use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A task is terminal once it has failed this many times
pub const MAX_ATTEMPTS: i32 = 3;

/// Fixed delay before a failed task becomes leasable again
pub const RETRY_BACKOFF_SECS: i64 = 2;

/// Delivery state of an outbox task, stored as uppercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created,
    Processing,
    Failed,
    NoAttemptsLeft,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Failed => "FAILED",
            TaskStatus::NoAttemptsLeft => "NO_ATTEMPTS_LEFT",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(TaskStatus::Created),
            "PROCESSING" => Ok(TaskStatus::Processing),
            "FAILED" => Ok(TaskStatus::Failed),
            "NO_ATTEMPTS_LEFT" => Ok(TaskStatus::NoAttemptsLeft),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Which audit table the task's entry_id points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    AuditLog,
    OrderStatusLog,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::AuditLog => "AUDIT_LOG",
            TaskType::OrderStatusLog => "ORDER_STATUS_LOG",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUDIT_LOG" => Ok(TaskType::AuditLog),
            "ORDER_STATUS_LOG" => Ok(TaskType::OrderStatusLog),
            other => Err(format!("unknown task type: {other}")),
        }
    }
}

/// One pending delivery in the transactional outbox
///
/// Created in the same transaction as its audit row, later leased and
/// published by the dispatcher. The payload sent to the broker is this
/// struct serialized as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxTask {
    pub task_id: i64,
    pub task_status: TaskStatus,
    pub task_type: TaskType,
    pub entry_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attempts_count: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl OutboxTask {
    /// Whether the dispatcher may lease this task at `now`
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        matches!(self.task_status, TaskStatus::Created | TaskStatus::Failed)
            && self.attempts_count < MAX_ATTEMPTS
            && self.next_attempt_at <= now
    }

    /// Transition into the leased state
    pub fn mark_processing(&mut self, now: DateTime<Utc>) {
        self.task_status = TaskStatus::Processing;
        self.updated_at = now;
    }

    /// Record one failed delivery attempt
    ///
    /// The attempt counter always advances. Below the limit the task goes
    /// back to FAILED with a short backoff; at the limit it becomes terminal
    /// and `finished_at` is stamped.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.attempts_count += 1;
        self.updated_at = now;

        if self.attempts_count >= MAX_ATTEMPTS {
            self.task_status = TaskStatus::NoAttemptsLeft;
            self.finished_at = Some(now);
        } else {
            self.task_status = TaskStatus::Failed;
            self.next_attempt_at = now + Duration::seconds(RETRY_BACKOFF_SECS);
        }
    }

    /// Whether a PROCESSING lease has been held longer than `timeout`
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.task_status == TaskStatus::Processing && self.updated_at + timeout <= now
    }

    /// Return a stale lease to the leasable pool without charging an attempt
    pub fn release(&mut self, now: DateTime<Utc>) {
        self.task_status = TaskStatus::Created;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(now: DateTime<Utc>) -> OutboxTask {
        OutboxTask {
            task_id: 1,
            task_status: TaskStatus::Created,
            task_type: TaskType::AuditLog,
            entry_id: 10,
            created_at: now,
            updated_at: now,
            attempts_count: 0,
            next_attempt_at: now,
            finished_at: None,
        }
    }

    #[test]
    fn fresh_task_is_ready() {
        let now = Utc::now();
        assert!(task(now).is_ready(now));
    }

    #[test]
    fn processing_task_is_not_ready() {
        let now = Utc::now();
        let mut t = task(now);
        t.mark_processing(now);
        assert!(!t.is_ready(now));
    }

    #[test]
    fn failure_sets_backoff_then_terminal_state() {
        let now = Utc::now();
        let mut t = task(now);

        t.record_failure(now);
        assert_eq!(t.task_status, TaskStatus::Failed);
        assert_eq!(t.attempts_count, 1);
        assert_eq!(t.next_attempt_at, now + Duration::seconds(RETRY_BACKOFF_SECS));
        assert!(t.finished_at.is_none());
        assert!(!t.is_ready(now));
        assert!(t.is_ready(now + Duration::seconds(RETRY_BACKOFF_SECS)));

        t.record_failure(now);
        assert_eq!(t.task_status, TaskStatus::Failed);
        assert_eq!(t.attempts_count, 2);

        t.record_failure(now);
        assert_eq!(t.task_status, TaskStatus::NoAttemptsLeft);
        assert_eq!(t.attempts_count, 3);
        assert_eq!(t.finished_at, Some(now));
        assert!(!t.is_ready(now + Duration::days(1)));
    }

    #[test]
    fn stale_detection_honors_timeout() {
        let now = Utc::now();
        let timeout = Duration::seconds(60);
        let mut t = task(now);

        assert!(!t.is_stale(now + Duration::seconds(120), timeout));

        t.mark_processing(now);
        assert!(!t.is_stale(now + Duration::seconds(30), timeout));
        assert!(t.is_stale(now + Duration::seconds(60), timeout));
    }

    #[test]
    fn release_restores_leasable_state_without_charging_attempt() {
        let now = Utc::now();
        let mut t = task(now);
        t.record_failure(now);
        t.mark_processing(now);

        let later = now + Duration::seconds(90);
        t.release(later);

        assert_eq!(t.task_status, TaskStatus::Created);
        assert_eq!(t.attempts_count, 1);
        assert!(t.is_ready(later));
    }

    #[test]
    fn status_and_type_round_trip_through_str() {
        for s in [
            TaskStatus::Created,
            TaskStatus::Processing,
            TaskStatus::Failed,
            TaskStatus::NoAttemptsLeft,
        ] {
            assert_eq!(s.as_str().parse::<TaskStatus>().unwrap(), s);
        }
        for t in [TaskType::AuditLog, TaskType::OrderStatusLog] {
            assert_eq!(t.as_str().parse::<TaskType>().unwrap(), t);
        }
    }
}
