//! OpenAI-compatible chat completion shapes and parsing of the structured
//! payloads the model is asked to return.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DecisionError;
use crate::models::NudgeAction;

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 150;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl ChatRequest {
    pub fn new(model: &str, system: &str, user: ChatMessage) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::system(system), user],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stop: vec!["\n\n".to_string(), "```".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: &str) -> Self {
        Self {
            role: "system",
            content: MessageContent::Text(text.to_string()),
        }
    }

    pub fn user(text: String) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(text),
        }
    }

    /// Text plus an inlined PNG for vision-capable models.
    pub fn user_with_image(text: String, png_base64: &str) -> Self {
        Self {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text { text },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{png_base64}"),
                    },
                },
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, trimmed.
    pub fn into_content(self) -> Result<String, DecisionError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| DecisionError::Malformed("response has no message content".into()))
    }
}

/// Decision fields as returned by the model, before confidence is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDecision {
    pub action: NudgeAction,
    pub reason: String,
    pub tip: Option<String>,
}

/// Parses the model's reply into a decision.
///
/// A missing `action` means the model saw something worth mentioning, so it becomes
/// `gentle_nudge`; a present but unrecognized or non-string `action` becomes `quiet`.
pub fn parse_decision(content: &str) -> Result<RemoteDecision, DecisionError> {
    let object = parse_object(content)?;

    let action = match object.get("action") {
        None | Some(Value::Null) => NudgeAction::GentleNudge,
        Some(Value::String(raw)) => NudgeAction::normalize(raw).unwrap_or(NudgeAction::Quiet),
        Some(_) => NudgeAction::Quiet,
    };

    Ok(RemoteDecision {
        action,
        reason: non_empty_str(&object, "reason").unwrap_or_else(|| "LLM decision".to_string()),
        tip: non_empty_str(&object, "tip"),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSuggestions {
    pub subtasks: Vec<String>,
    pub encouragement: String,
    pub estimated_minutes: u32,
}

impl TaskSuggestions {
    pub fn fallback(task: &str) -> Self {
        Self {
            subtasks: vec![
                format!("Write down the goal of \"{task}\" in one sentence"),
                "List the first three concrete steps".to_string(),
                "Work on the first step for 25 minutes".to_string(),
            ],
            encouragement: "Start small, then keep going.".to_string(),
            estimated_minutes: 25,
        }
    }
}

pub fn parse_suggestions(content: &str) -> Result<TaskSuggestions, DecisionError> {
    let object = parse_object(content)?;

    let subtasks: Vec<String> = object
        .get("subtasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if subtasks.is_empty() {
        return Err(DecisionError::Malformed("no subtasks in suggestion".into()));
    }

    Ok(TaskSuggestions {
        subtasks,
        encouragement: non_empty_str(&object, "encouragement").unwrap_or_default(),
        estimated_minutes: object
            .get("estimated_minutes")
            .and_then(Value::as_u64)
            .and_then(|minutes| u32::try_from(minutes).ok())
            .unwrap_or(25),
    })
}

/// Models sometimes wrap the object in prose or code fences; take the outermost braces.
fn parse_object(content: &str) -> Result<Map<String, Value>, DecisionError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let slice = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => return Err(DecisionError::Malformed("no JSON object in reply".into())),
    };

    match serde_json::from_str::<Value>(slice) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DecisionError::Malformed("reply is not a JSON object".into())),
        Err(err) => Err(DecisionError::Malformed(err.to_string())),
    }
}

fn non_empty_str(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
