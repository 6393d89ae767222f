//! Local decision rules used when the remote service cannot be consulted, and
//! the LLM-free productivity classifier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::{NudgeAction, NudgingPolicy, Observation};

/// Idle time after which the rule-only classifier calls the user unproductive.
pub const CLASSIFIER_IDLE_MS: u64 = 5_000;
/// Idle time after which the fallback table suggests a gentle nudge.
pub const FALLBACK_IDLE_MS: u64 = 5 * 60 * 1000;

/// Video, social and gaming surfaces that warrant a strong nudge.
const STRONG_KEYWORDS: &[&str] = &[
    "youtube",
    "tiktok",
    "netflix",
    "prime video",
    "twitch",
    "instagram",
    "facebook",
    "twitter",
    "steam",
    "おすすめ動画",
];

/// Lower-confidence distractions: forums, news, shopping.
const GENTLE_KEYWORDS: &[&str] = &[
    "reddit",
    "forum",
    "news",
    "amazon",
    "ebay",
    "shopping",
    "trending",
];

const CLASSIFIER_BLACKLIST: &[&str] = &[
    "youtube",
    "tiktok",
    "prime video",
    "steam",
    "twitter",
    "instagram",
    "facebook",
    "reddit",
    "おすすめ動画",
    "trending",
];

/// What the engine returns when the remote decision is unusable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Always `quiet` with zero confidence.
    #[default]
    Static,
    /// Evaluate [`fallback_policy`].
    Rules,
}

impl FallbackStrategy {
    pub fn apply(&self, observation: &Observation, reason: &str) -> NudgingPolicy {
        match self {
            FallbackStrategy::Static => NudgingPolicy::unavailable(reason),
            FallbackStrategy::Rules => fallback_policy(observation),
        }
    }
}

impl FromStr for FallbackStrategy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "static" | "quiet" => Ok(FallbackStrategy::Static),
            "rules" | "rule" => Ok(FallbackStrategy::Rules),
            other => Err(anyhow::anyhow!("unknown fallback strategy '{other}'")),
        }
    }
}

/// Keyword and threshold table. Phone use and long idle are checked before any
/// keyword scan; a strong keyword beats a gentle one.
pub fn fallback_policy(observation: &Observation) -> NudgingPolicy {
    if observation.phone_in_use() {
        return NudgingPolicy::new(
            NudgeAction::StrongNudge,
            "Phone use detected",
            Some("Put the phone away and return to your task"),
            0.9,
        );
    }

    if observation.idle_ms >= FALLBACK_IDLE_MS {
        return NudgingPolicy::new(
            NudgeAction::GentleNudge,
            format!("Idle for {} min", observation.idle_ms / 60_000),
            Some("Take a short break, then pick the task back up"),
            0.7,
        );
    }

    let surface = observation.surface_text();

    if let Some(keyword) = first_match(&surface, STRONG_KEYWORDS) {
        return NudgingPolicy {
            action: NudgeAction::StrongNudge,
            reason: format!("Major distraction: {keyword}"),
            tip: Some(format!("Close {keyword} and get back to your task")),
            confidence: 0.85,
        };
    }

    if let Some(keyword) = first_match(&surface, GENTLE_KEYWORDS) {
        return NudgingPolicy {
            action: NudgeAction::GentleNudge,
            reason: format!("Minor distraction: {keyword}"),
            tip: Some("Is this part of your task? If not, switch back".to_string()),
            confidence: 0.6,
        };
    }

    NudgingPolicy::new(NudgeAction::Quiet, "No distraction detected", None, 0.3)
}

/// Rule-only productivity verdict.
pub fn is_productive(observation: &Observation) -> bool {
    if observation.idle_ms >= CLASSIFIER_IDLE_MS {
        return false;
    }
    if observation.phone_in_use() {
        return false;
    }
    first_match(&observation.content_text(), CLASSIFIER_BLACKLIST).is_none()
}

fn first_match(haystack: &str, keywords: &[&'static str]) -> Option<&'static str> {
    keywords.iter().copied().find(|keyword| haystack.contains(keyword))
}
