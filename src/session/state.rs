use anyhow::{bail, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;

use crate::models::{FocusSession, NudgingPolicy, Observation};

pub const DEFAULT_FOCUS_TARGET: &str = "general work";
const LOG_CAPACITY: usize = 100;

/// Everything the ingestion path and the ticker share. Always reflects the most
/// recent ingestion; nothing survives a restart.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub focus_target: String,
    pub productive: bool,
    pub last_policy: Option<NudgingPolicy>,
    pub last_observation: Option<Observation>,
    pub current_session: Option<FocusSession>,
    /// Task id of the most recently completed focus session.
    pub done: Option<String>,
    logs: VecDeque<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            focus_target: DEFAULT_FOCUS_TARGET.to_string(),
            productive: false,
            last_policy: None,
            last_observation: None,
            current_session: None,
            done: None,
            logs: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub focus_target: String,
    pub productive: bool,
    pub last_policy: Option<NudgingPolicy>,
    pub last_observation: Option<Observation>,
    pub current_session: Option<FocusSession>,
    pub done: Option<String>,
    pub logs: Vec<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_focus_target(&mut self, target: &str) -> Result<()> {
        if target.trim().is_empty() {
            bail!("focus target must not be empty");
        }
        self.focus_target = target.to_string();
        self.push_log(format!("Focus target updated to: {target}"));
        Ok(())
    }

    pub fn record_ingestion(
        &mut self,
        productive: bool,
        policy: NudgingPolicy,
        observation: Observation,
    ) {
        self.productive = productive;
        self.last_policy = Some(policy);
        self.last_observation = Some(observation);
    }

    pub fn begin_session(&mut self, session: FocusSession) {
        self.push_log(format!(
            "Focus session started: {} ({} ms goal)",
            session.task_id, session.goal_ms
        ));
        self.current_session = Some(session);
        self.done = None;
    }

    /// Credits `tick_ms` to the running session if the latest verdict was productive.
    /// Returns the session when this tick completed it; it is then cleared.
    pub fn apply_tick(&mut self, tick_ms: u64) -> Option<FocusSession> {
        let session = self.current_session.as_mut()?;
        if self.productive {
            session.credit(tick_ms);
        }
        if !session.is_complete() {
            return None;
        }

        let finished = self.current_session.take()?;
        self.done = Some(finished.task_id.clone());
        self.push_log(format!(
            "Focus session completed: {} at {}",
            finished.task_id,
            Utc::now().to_rfc3339()
        ));
        Some(finished)
    }

    pub fn push_log(&mut self, line: String) {
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub fn logs(&self) -> impl Iterator<Item = &str> {
        self.logs.iter().map(String::as_str)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            focus_target: self.focus_target.clone(),
            productive: self.productive,
            last_policy: self.last_policy.clone(),
            last_observation: self.last_observation.as_ref().map(Observation::redacted),
            current_session: self.current_session.clone(),
            done: self.done.clone(),
            logs: self.logs.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NudgeAction;
    use std::time::Duration;

    fn session_with_goal(secs: u64) -> FocusSession {
        FocusSession::begin("write_report", Duration::from_secs(secs), Utc::now()).unwrap()
    }

    #[test]
    fn five_productive_ticks_finish_a_ten_second_goal() {
        let mut state = SessionState::new();
        state.productive = true;
        state.begin_session(session_with_goal(10));

        for _ in 0..4 {
            assert!(state.apply_tick(2_000).is_none());
        }
        let finished = state.apply_tick(2_000).expect("fifth tick completes the goal");

        assert_eq!(finished.accum_ms, 10_000);
        assert!(state.current_session.is_none());
        assert_eq!(state.done.as_deref(), Some("write_report"));
    }

    #[test]
    fn unproductive_ticks_add_nothing() {
        let mut state = SessionState::new();
        state.begin_session(session_with_goal(10));

        state.productive = true;
        state.apply_tick(2_000);
        state.productive = false;
        state.apply_tick(2_000);
        state.apply_tick(2_000);

        assert_eq!(state.current_session.as_ref().unwrap().accum_ms, 2_000);
        assert!(state.done.is_none());
    }

    #[test]
    fn tick_without_session_is_noop() {
        let mut state = SessionState::new();
        state.productive = true;
        assert!(state.apply_tick(2_000).is_none());
    }

    #[test]
    fn blank_focus_target_is_rejected() {
        let mut state = SessionState::new();
        assert!(state.set_focus_target("   ").is_err());
        assert_eq!(state.focus_target, DEFAULT_FOCUS_TARGET);

        state.set_focus_target("write the parser").unwrap();
        assert_eq!(state.focus_target, "write the parser");
    }

    #[test]
    fn log_is_bounded() {
        let mut state = SessionState::new();
        for i in 0..150 {
            state.push_log(format!("line {i}"));
        }
        let lines: Vec<_> = state.logs().collect();
        assert_eq!(lines.len(), LOG_CAPACITY);
        assert_eq!(lines[0], "line 50");
    }

    #[test]
    fn snapshot_drops_screenshot() {
        let mut state = SessionState::new();
        state.record_ingestion(
            true,
            NudgingPolicy::new(NudgeAction::Quiet, "fine", None, 0.8),
            Observation {
                screenshot: Some("iVBORw0KGgo".into()),
                ..Default::default()
            },
        );

        let snapshot = state.snapshot();
        assert!(snapshot.productive);
        assert!(snapshot.last_observation.unwrap().screenshot.is_none());
    }
}
