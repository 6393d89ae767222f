use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
        }
    }
}

/// A goal-bound focus session. Only productive ticks count toward `accum_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: String,
    pub task_id: String,
    pub status: SessionStatus,
    pub goal_ms: u64,
    pub accum_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl FocusSession {
    pub fn begin(task_id: &str, goal: Duration, started_at: DateTime<Utc>) -> Result<Self> {
        if task_id.trim().is_empty() {
            bail!("task_id must not be empty");
        }
        let goal_ms = u64::try_from(goal.as_millis()).unwrap_or(u64::MAX);
        if goal_ms == 0 {
            bail!("goal must be greater than zero");
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            status: SessionStatus::Running,
            goal_ms,
            accum_ms: 0,
            started_at,
        })
    }

    pub fn credit(&mut self, elapsed_ms: u64) {
        self.accum_ms = self.accum_ms.saturating_add(elapsed_ms);
        if self.accum_ms >= self.goal_ms {
            self.status = SessionStatus::Completed;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn remaining_ms(&self) -> u64 {
        self.goal_ms.saturating_sub(self.accum_ms)
    }
}

/// Inbound request to start a focus session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusStart {
    pub task_id: String,
    pub minutes: i64,
}

impl FocusStart {
    pub fn goal(&self) -> Result<Duration> {
        if self.task_id.trim().is_empty() {
            bail!("task_id must not be empty");
        }
        if self.minutes <= 0 {
            bail!("minutes must be positive");
        }
        Ok(Duration::from_secs((self.minutes as u64).saturating_mul(60)))
    }
}
