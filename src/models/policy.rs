use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum NudgeAction {
    #[default]
    Quiet,
    GentleNudge,
    StrongNudge,
}

impl NudgeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NudgeAction::Quiet => "quiet",
            NudgeAction::GentleNudge => "gentle_nudge",
            NudgeAction::StrongNudge => "strong_nudge",
        }
    }

    /// Lenient parse of a model-produced label: case, surrounding whitespace and
    /// `-`/space separators are ignored. Anything else is `None`.
    pub fn normalize(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match key.as_str() {
            "quiet" => Some(NudgeAction::Quiet),
            "gentle_nudge" => Some(NudgeAction::GentleNudge),
            "strong_nudge" => Some(NudgeAction::StrongNudge),
            _ => None,
        }
    }
}

/// Decision for one observation. Confidence is advisory and never drives control flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NudgingPolicy {
    pub action: NudgeAction,
    pub reason: String,
    pub tip: Option<String>,
    pub confidence: f64,
}

impl NudgingPolicy {
    pub fn new(
        action: NudgeAction,
        reason: impl Into<String>,
        tip: Option<&str>,
        confidence: f64,
    ) -> Self {
        Self {
            action,
            reason: reason.into(),
            tip: tip.map(str::to_string),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Static "stay quiet" decision used when the remote service cannot be consulted.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(NudgeAction::Quiet, reason, None, 0.0)
    }

    pub fn is_quiet(&self) -> bool {
        self.action == NudgeAction::Quiet
    }
}
