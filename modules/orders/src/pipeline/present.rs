//! Presentation stage sink
//!
//! Formats audit jobs and logs the ones that match the configured filter
//! word. Filtering only affects what gets logged; every job in the batch is
//! still forwarded by the surrounding stage.

use async_trait::async_trait;
use std::fmt::Write;

use crate::domain::AuditEvent;

use super::stage::BatchSink;
use super::PipelineError;

/// Batch sink that logs formatted audit entries
pub struct PresentationSink {
    filter_word: Option<String>,
}

impl PresentationSink {
    pub fn new(filter_word: Option<String>) -> Self {
        Self { filter_word }
    }
}

#[async_trait]
impl BatchSink<AuditEvent> for PresentationSink {
    async fn process_batch(&self, batch: &[AuditEvent]) -> Result<(), PipelineError> {
        for event in batch {
            let formatted = format_audit(event);

            if let Some(word) = &self.filter_word {
                if !formatted.to_lowercase().contains(&word.to_lowercase()) {
                    continue;
                }
            }

            tracing::info!(audit = %formatted, "audit entry processed");
        }

        Ok(())
    }
}

/// Render an audit job as a multiline log entry
pub fn format_audit(event: &AuditEvent) -> String {
    match event {
        AuditEvent::Request(record) => {
            let mut headers = String::new();
            for (name, value) in &record.headers {
                let _ = writeln!(headers, "{name}: {value}");
            }

            format!(
                "\nAudit Request Entry:\n\
                 ---------------\n\
                 Method: {}\n\
                 Path: {}\n\
                 Status Code: {}\n\
                 \n\
                 Headers:\n\
                 {}\n\
                 Request Body: {}\n\
                 \n\
                 Response Body: {}\n",
                record.method,
                record.path,
                record.status_code,
                headers,
                record.request_body,
                record.response_body,
            )
        }
        AuditEvent::StatusChange(record) => {
            format!(
                "\nAudit OrderStatusLog Entry:\n\
                 ---------------\n\
                 OrderID: {}\n\
                 Previous Status: {}\n\
                 Current Status: {}\n",
                record.order_id, record.previous_status, record.current_status,
            )
        }
    }
}
