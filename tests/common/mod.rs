#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nudgefocus_lib::decision::{EngineConfig, FallbackStrategy};
use nudgefocus_lib::models::Observation;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Base URL nothing listens on.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub received_at: Instant,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: "{}".to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Chat completion body whose first choice carries `content`.
pub fn chat_body(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

pub fn models_body() -> String {
    json!({ "object": "list", "data": [{ "id": "test-model", "object": "model" }] }).to_string()
}

type Responder = dyn Fn(&RecordedRequest) -> Reply + Send + Sync;

/// Minimal HTTP/1.1 server standing in for an OpenAI-compatible service.
pub struct FakeService {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeService {
    pub async fn spawn<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let recorded = recorded.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(stream, recorded, responder).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    /// Answers the liveness probe and replies to every chat call with `content`.
    pub async fn chat(content: &'static str) -> Self {
        Self::spawn(move |request| {
            if request.path.ends_with("/v1/models") {
                Reply::ok(models_body())
            } else {
                Reply::ok(chat_body(content))
            }
        })
        .await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path.ends_with("/v1/chat/completions"))
            .collect()
    }

    pub fn config(&self) -> EngineConfig {
        engine_config(&self.base_url)
    }
}

pub fn engine_config(base_url: &str) -> EngineConfig {
    EngineConfig {
        min_call_interval: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_secs(2),
        fallback: FallbackStrategy::Static,
        ..EngineConfig::new(base_url, "test-model")
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < head_end + content_length {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let body_end = (head_end + content_length).min(buffer.len());
    let body = String::from_utf8_lossy(&buffer[head_end..body_end]).to_string();

    let request = RecordedRequest {
        method,
        path,
        headers,
        body,
        received_at: Instant::now(),
    };
    recorded.lock().unwrap().push(request.clone());

    let reply = responder(&request);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let response = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reply.body.len(),
        reply.body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

pub fn coding_observation() -> Observation {
    Observation {
        active_app: Some("Code.exe".into()),
        title: "main.py - editor".into(),
        idle_ms: 1_000,
        phone_detected: false,
        ..Default::default()
    }
}

pub fn cat_video_observation() -> Observation {
    Observation {
        active_app: Some("chrome.exe".into()),
        title: "Funny Cats - YouTube".into(),
        url: "https://youtube.com/watch?v=cats".into(),
        phone_detected: true,
        ..Default::default()
    }
}

pub fn long_idle_observation() -> Observation {
    Observation {
        active_app: Some("explorer.exe".into()),
        title: "Desktop".into(),
        idle_ms: 400_000,
        ..Default::default()
    }
}
