//! Batch events for progress and JSON output.
//!
//! Batch operations report what they do through a callback instead of
//! printing; the CLI turns events into status lines, a progress bar, or one
//! JSON object per line with `--message-format json`.

use serde::Serialize;

use crate::core::error::BerthError;

/// One step of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum BatchEvent {
    /// The batch is about to start.
    BatchStarted {
        operation: String,
        total: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },

    /// Work on one entity began.
    EntityStarted { operation: String, name: String },

    /// An external command is about to run (or would run, for dry runs).
    Command { name: String, command: String },

    EntityFinished { operation: String, name: String },

    EntityFailed {
        operation: String,
        name: String,
        message: String,
    },

    BatchFinished {
        operation: String,
        succeeded: usize,
        failed: usize,
    },
}

/// Outcome of a best-effort batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, BerthError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Event callback.
pub type EventSink<'a> = &'a mut dyn FnMut(&BatchEvent);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = BatchEvent::EntityFailed {
            operation: "deploy".into(),
            name: "svc".into(),
            message: "boom".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["reason"], "entity-failed");
        assert_eq!(json["name"], "svc");

        let started = BatchEvent::BatchStarted {
            operation: "undeploy".into(),
            total: 2,
            context: None,
        };
        let json = serde_json::to_string(&started).unwrap();
        assert_eq!(
            json,
            r#"{"reason":"batch-started","operation":"undeploy","total":2}"#
        );
    }

    #[test]
    fn test_report() {
        let mut report = BatchReport::default();
        report.succeeded.push("store".into());
        assert!(report.is_success());
        report
            .failed
            .push(("web".into(), BerthError::not_found("resource", "web")));
        assert!(!report.is_success());
        assert_eq!(report.failed_names(), ["web"]);
    }
}
