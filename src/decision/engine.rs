use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

use super::error::DecisionError;
use super::prompt::{build_context, build_suggestion_request, SUGGESTION_PROMPT, SYSTEM_PROMPT};
use super::rate_limit::RateLimiter;
use super::rules::FallbackStrategy;
use super::wire::{
    parse_decision, parse_suggestions, ChatMessage, ChatRequest, ChatResponse, RemoteDecision,
    TaskSuggestions,
};
use crate::models::{NudgingPolicy, Observation};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Confidence attached to every successfully parsed remote decision. The service
/// picks the category; it does not calibrate confidence.
pub const REMOTE_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub min_call_interval: Duration,
    pub fallback: FallbackStrategy,
}

impl EngineConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            request_timeout: Duration::from_secs(20),
            probe_timeout: Duration::from_secs(5),
            min_call_interval: Duration::from_secs(1),
            fallback: FallbackStrategy::Static,
        }
    }
}

/// Client for an OpenAI-compatible chat service that decides how to nudge.
///
/// `decide` never fails: an unreachable service, a bad status, a timeout or an
/// unparseable reply all turn into the configured fallback policy.
pub struct NudgeEngine {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    request_timeout: Duration,
    probe_timeout: Duration,
    limiter: RateLimiter,
    fallback: FallbackStrategy,
}

impl NudgeEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client for decision service")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            request_timeout: config.request_timeout,
            probe_timeout: config.probe_timeout,
            limiter: RateLimiter::new(config.min_call_interval),
            fallback: config.fallback,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn fallback(&self) -> FallbackStrategy {
        self.fallback
    }

    pub fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Cheap reachability check: any 2xx from the model listing counts.
    pub async fn is_available(&self) -> bool {
        let request = self
            .authorize(self.client.get(self.models_url()))
            .timeout(self.probe_timeout);

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                log_debug!("liveness probe failed: {err}");
                false
            }
        }
    }

    pub async fn decide(&self, task: &str, observation: &Observation) -> NudgingPolicy {
        if !self.is_available().await {
            log_warn!("decision service at {} unavailable, using fallback", self.base_url);
            return self
                .fallback
                .apply(observation, DecisionError::Unavailable.fallback_reason());
        }

        match self.request_decision(task, observation).await {
            Ok(decision) => {
                log_info!(
                    "remote decision: {} ({})",
                    decision.action.as_str(),
                    decision.reason
                );
                NudgingPolicy {
                    action: decision.action,
                    reason: decision.reason,
                    tip: decision.tip,
                    confidence: REMOTE_CONFIDENCE,
                }
            }
            Err(err) => {
                log_warn!("remote decision failed: {err}");
                self.fallback.apply(observation, err.fallback_reason())
            }
        }
    }

    async fn request_decision(
        &self,
        task: &str,
        observation: &Observation,
    ) -> Result<RemoteDecision, DecisionError> {
        let context = build_context(task, observation);
        let message = match observation.screenshot() {
            Some(png) => ChatMessage::user_with_image(context, png),
            None => ChatMessage::user(context),
        };

        let content = self.chat(SYSTEM_PROMPT, message).await?;
        parse_decision(&content)
    }

    /// One rate-limited chat completion; returns the first choice's text.
    async fn chat(&self, system: &str, message: ChatMessage) -> Result<String, DecisionError> {
        self.limiter.acquire().await;

        let payload = ChatRequest::new(&self.model, system, message);
        let response = self
            .authorize(self.client.post(self.chat_url()))
            .timeout(self.request_timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DecisionError::Status(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        body.into_content()
    }

    /// Model listing from the service, or a synthetic listing naming the configured model.
    pub async fn model_info(&self) -> Value {
        match self.fetch_model_info().await {
            Ok(info) => info,
            Err(err) => {
                log_warn!("model listing failed: {err}");
                json!({
                    "object": "list",
                    "data": [{ "id": self.model, "object": "model" }],
                })
            }
        }
    }

    async fn fetch_model_info(&self) -> Result<Value, reqwest::Error> {
        let response = self
            .authorize(self.client.get(self.models_url()))
            .timeout(self.probe_timeout)
            .send()
            .await?
            .error_for_status()?;
        response.json::<Value>().await
    }

    /// Breaks a task into first steps; falls back to a generic plan on any failure.
    pub async fn suggest_tasks(&self, task: &str) -> TaskSuggestions {
        if !self.is_available().await {
            return TaskSuggestions::fallback(task);
        }

        self.request_suggestions(task).await.unwrap_or_else(|err| {
            log_warn!("task suggestions failed: {err}");
            TaskSuggestions::fallback(task)
        })
    }

    async fn request_suggestions(&self, task: &str) -> Result<TaskSuggestions, DecisionError> {
        let message = ChatMessage::user(build_suggestion_request(task));
        let content = self.chat(SUGGESTION_PROMPT, message).await?;
        parse_suggestions(&content)
    }
}
