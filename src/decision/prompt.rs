use crate::models::Observation;

const IDLE_SHORT_MS: u64 = 5_000;
const IDLE_LONG_MS: u64 = 60_000;
const FIELD_LIMIT: usize = 80;

pub const SYSTEM_PROMPT: &str = "\
You are a productivity nudging assistant.
Analyze the user's current activity and decide the best nudging action.

Return ONLY a JSON object with these exact keys:
- action: one of \"quiet\", \"gentle_nudge\", \"strong_nudge\"
- reason: brief explanation (max 50 chars)
- tip: optional helpful suggestion (max 100 chars)

Rules:
- \"quiet\": User is being productive, no intervention needed
- \"gentle_nudge\": Minor distraction, gentle reminder
- \"strong_nudge\": Major distraction, needs immediate attention

Focus on being helpful, not annoying.";

pub const SUGGESTION_PROMPT: &str = "\
You help people start tasks they are putting off.
Return ONLY a JSON object with these exact keys:
- subtasks: list of 3-5 short concrete steps
- encouragement: one short motivating sentence
- estimated_minutes: integer estimate for the first step";

/// Human-readable idle bucket: `active` up to 5s, seconds up to a minute, then minutes and seconds.
pub fn describe_idle(idle_ms: u64) -> String {
    if idle_ms > IDLE_LONG_MS {
        format!(
            "{}min {}sec idle",
            idle_ms / IDLE_LONG_MS,
            (idle_ms % IDLE_LONG_MS) / 1000
        )
    } else if idle_ms > IDLE_SHORT_MS {
        format!("{}sec idle", idle_ms / 1000)
    } else {
        "active".to_string()
    }
}

/// Truncates on character boundaries.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_context(task: &str, observation: &Observation) -> String {
    let url = if observation.url.is_empty() {
        "N/A"
    } else {
        truncate_chars(&observation.url, FIELD_LIMIT)
    };
    let screenshot = if observation.screenshot().is_some() {
        "Available"
    } else {
        "Not available"
    };

    format!(
        "Task: {task}\n\
         Current Activity:\n\
         - App: {app}\n\
         - Window: {title}\n\
         - URL: {url}\n\
         - Status: {status}\n\
         - Screenshot: {screenshot}\n\
         \n\
         Please analyze the screenshot (if available) to determine\n\
         if the user is focused on their task or being distracted.\n\
         Decide the best nudging action now.",
        app = observation.app_name(),
        title = truncate_chars(&observation.title, FIELD_LIMIT),
        status = describe_idle(observation.idle_ms),
    )
}

pub fn build_suggestion_request(task: &str) -> String {
    format!("Task: {task}\nBreak this task into small steps I can start right now.")
}
