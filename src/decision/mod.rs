pub mod engine;
pub mod error;
pub mod prompt;
pub mod rate_limit;
pub mod rules;
pub mod wire;

use std::sync::Arc;

pub use engine::{EngineConfig, NudgeEngine, REMOTE_CONFIDENCE};
pub use error::DecisionError;
pub use rate_limit::RateLimiter;
pub use rules::{fallback_policy, is_productive, FallbackStrategy};
pub use wire::TaskSuggestions;

use crate::models::{NudgingPolicy, Observation};

/// Where productivity verdicts come from. Built once at startup and shared.
#[derive(Clone)]
pub enum Decider {
    /// Remote service; productive iff the policy is `quiet`.
    Remote(Arc<NudgeEngine>),
    /// Rule-only classifier; the policy comes from the local rule table.
    Rules,
}

impl Decider {
    pub async fn evaluate(&self, task: &str, observation: &Observation) -> (bool, NudgingPolicy) {
        match self {
            Decider::Remote(engine) => {
                let policy = engine.decide(task, observation).await;
                (policy.is_quiet(), policy)
            }
            Decider::Rules => (is_productive(observation), fallback_policy(observation)),
        }
    }

    pub fn engine(&self) -> Option<&Arc<NudgeEngine>> {
        match self {
            Decider::Remote(engine) => Some(engine),
            Decider::Rules => None,
        }
    }
}
