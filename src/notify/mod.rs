//! Desktop notification side effects. Rendering is up to the sink; this module
//! only decides whether to notify and with what text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::models::{NudgeAction, NudgingPolicy};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Urgent,
}

pub trait NotificationSink: Send + Sync {
    /// Returns whether the notification reached the user.
    fn notify(&self, title: &str, message: &str, level: NotificationLevel) -> bool;
}

/// Writes notifications to the log. Used when no desktop integration is wired in.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, title: &str, message: &str, level: NotificationLevel) -> bool {
        match level {
            NotificationLevel::Info => log::info!("[notify] {title}: {message}"),
            NotificationLevel::Warning => log::warn!("[notify] {title}: {message}"),
            NotificationLevel::Urgent => log::error!("[notify] {title}: {message}"),
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    pub delivered: bool,
    pub timestamp: DateTime<Utc>,
}

/// Keeps every request, optionally forwarding to another sink.
#[derive(Default)]
pub struct RecordingSink {
    inner: Option<Arc<dyn NotificationSink>>,
    history: Mutex<Vec<NotificationRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding(inner: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Some(inner),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<NotificationRecord> {
        match self.history.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, title: &str, message: &str, level: NotificationLevel) -> bool {
        let delivered = self
            .inner
            .as_ref()
            .map(|sink| sink.notify(title, message, level))
            .unwrap_or(false);

        let record = NotificationRecord {
            title: title.to_string(),
            message: message.to_string(),
            level,
            delivered,
            timestamp: Utc::now(),
        };
        match self.history.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        delivered
    }
}

/// Title, body and level for a policy, or `None` when it is quiet.
pub fn nudge_message(
    policy: &NudgingPolicy,
) -> Option<(&'static str, String, NotificationLevel)> {
    let body = match &policy.tip {
        Some(tip) => format!("{} - {}", policy.reason, tip),
        None => policy.reason.clone(),
    };

    match policy.action {
        NudgeAction::Quiet => None,
        NudgeAction::GentleNudge => Some(("Focus check", body, NotificationLevel::Warning)),
        NudgeAction::StrongNudge => Some(("Focus check - now!", body, NotificationLevel::Urgent)),
    }
}

/// Sink plus an on/off switch, shared by the ingestion path and the ticker.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    enabled: bool,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(LogSink), false)
    }

    pub fn policy(&self, policy: &NudgingPolicy) -> bool {
        if !self.enabled {
            return false;
        }
        match nudge_message(policy) {
            Some((title, body, level)) => self.sink.notify(title, &body, level),
            None => false,
        }
    }

    pub fn session_complete(&self, task_id: &str) -> bool {
        if !self.enabled {
            return false;
        }
        self.sink.notify(
            "Session complete",
            &format!("'{task_id}' reached its focus goal"),
            NotificationLevel::Info,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_policies_do_not_notify() {
        let recorder = Arc::new(RecordingSink::new());
        let notifier = Notifier::new(recorder.clone(), true);

        assert!(!notifier.policy(&NudgingPolicy::unavailable("LLM unavailable")));
        assert!(recorder.history().is_empty());
    }

    #[test]
    fn nudges_map_to_levels() {
        let recorder = Arc::new(RecordingSink::forwarding(Arc::new(LogSink)));
        let notifier = Notifier::new(recorder.clone(), true);

        let gentle = NudgingPolicy::new(
            NudgeAction::GentleNudge,
            "Minor distraction: reddit",
            None,
            0.6,
        );
        let strong = NudgingPolicy::new(
            NudgeAction::StrongNudge,
            "Phone use detected",
            Some("Put the phone away"),
            0.9,
        );
        assert!(notifier.policy(&gentle));
        assert!(notifier.policy(&strong));
        assert!(notifier.session_complete("write_report"));

        let history = recorder.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].level, NotificationLevel::Warning);
        assert_eq!(history[1].level, NotificationLevel::Urgent);
        assert_eq!(history[1].message, "Phone use detected - Put the phone away");
        assert_eq!(history[2].level, NotificationLevel::Info);
        assert!(history.iter().all(|record| record.delivered));
    }

    #[test]
    fn disabled_notifier_stays_silent() {
        let recorder = Arc::new(RecordingSink::new());
        let notifier = Notifier::new(recorder.clone(), false);
        let strong = NudgingPolicy::new(NudgeAction::StrongNudge, "x", None, 0.9);

        assert!(!notifier.policy(&strong));
        assert!(!notifier.session_complete("t"));
        assert!(recorder.history().is_empty());
    }

    #[test]
    fn undelivered_requests_are_still_recorded() {
        let recorder = RecordingSink::new();
        assert!(!recorder.notify("t", "m", NotificationLevel::Info));
        assert!(!recorder.history()[0].delivered);
    }
}
