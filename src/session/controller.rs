use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};

use crate::decision::{Decider, TaskSuggestions};
use crate::models::{FocusSession, FocusStart, NudgingPolicy, Observation};
use crate::notify::Notifier;

use super::state::{SessionState, StatusSnapshot};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub ok: bool,
    pub productive: bool,
    pub policy: NudgingPolicy,
}

/// Owns the shared session record. The ingestion path and the ticker both go
/// through `state`, so their updates never interleave.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    /// Held for a whole ingestion so overlapping calls finish in arrival order.
    ingest_gate: Arc<Mutex<()>>,
    decider: Decider,
    notifier: Notifier,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl SessionController {
    pub fn new(decider: Decider, notifier: Notifier, tick_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            ingest_gate: Arc::new(Mutex::new(())),
            decider,
            notifier,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    pub fn decider(&self) -> &Decider {
        &self.decider
    }

    /// Classifies one observation and records the outcome.
    ///
    /// The state lock is released during the decision call, which may wait on the
    /// rate limiter and the remote service, so the ticker keeps running. Ingestions
    /// queue behind each other; the record always reflects the last one to arrive.
    pub async fn ingest(&self, observation: Observation) -> IngestResult {
        let _gate = self.ingest_gate.lock().await;
        let task = self.state.lock().await.focus_target.clone();

        let (productive, policy) = self.decider.evaluate(&task, &observation).await;

        let screenshot_error = if observation.screenshot_error.is_empty() {
            "None"
        } else {
            observation.screenshot_error.as_str()
        };
        let summary = format!(
            "Event processed. Productive: {}. Nudge action: {} | screenshot_b64_len={} | error={}",
            productive,
            policy.action.as_str(),
            observation.screenshot_len(),
            screenshot_error,
        );
        log_info!("{summary}");

        {
            let mut state = self.state.lock().await;
            state.record_ingestion(productive, policy.clone(), observation);
            state.push_log(summary);
        }

        self.notifier.policy(&policy);

        IngestResult {
            ok: true,
            productive,
            policy,
        }
    }

    pub async fn update_focus_target(&self, target: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        state.set_focus_target(target)?;
        log_info!("Focus target updated to: {target}");
        Ok(state.focus_target.clone())
    }

    pub async fn start_focus(&self, task_id: &str, goal: Duration) -> Result<FocusSession> {
        let session = FocusSession::begin(task_id, goal, Utc::now())?;
        {
            let mut state = self.state.lock().await;
            state.begin_session(session.clone());
        }
        log_info!("focus session {} started for {task_id}", session.id);

        self.ensure_ticker().await;
        Ok(session)
    }

    pub async fn start_focus_request(&self, request: &FocusStart) -> Result<FocusSession> {
        let goal = request.goal()?;
        self.start_focus(&request.task_id, goal).await
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn suggest_tasks(&self, task: &str) -> TaskSuggestions {
        match self.decider.engine() {
            Some(engine) => engine.suggest_tasks(task).await,
            None => TaskSuggestions::fallback(task),
        }
    }

    pub async fn model_info(&self) -> Value {
        match self.decider.engine() {
            Some(engine) => engine.model_info().await,
            None => json!({ "object": "list", "data": [] }),
        }
    }

    pub async fn ensure_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if ticker_guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let state = self.state.clone();
        let notifier = self.notifier.clone();
        let tick_interval = self.tick_interval;
        let tick_ms = u64::try_from(tick_interval.as_millis()).unwrap_or(u64::MAX);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let finished = {
                    let mut guard = state.lock().await;
                    guard.apply_tick(tick_ms)
                };

                if let Some(session) = finished {
                    log_info!(
                        "focus session {} complete ({} ms productive)",
                        session.task_id,
                        session.accum_ms
                    );
                    notifier.session_complete(&session.task_id);
                } else {
                    log_debug!("tick");
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    pub async fn shutdown(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
