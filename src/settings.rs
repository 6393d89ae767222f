use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, str::FromStr, time::Duration};

use crate::decision::{EngineConfig, FallbackStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    Remote,
    Rules,
}

impl FromStr for DecisionMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" | "llm" => Ok(DecisionMode::Remote),
            "rules" | "rule" => Ok(DecisionMode::Rules),
            other => Err(anyhow!("unknown decision mode '{other}'")),
        }
    }
}

/// Optional JSON config file; every key is optional and environment variables win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    decision_mode: Option<String>,
    llm_url: Option<String>,
    llm_model: Option<String>,
    llm_api_key: Option<String>,
    fallback: Option<String>,
    tick_secs: Option<u64>,
    poll_secs: Option<u64>,
    min_call_interval_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
    notify: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: DecisionMode,
    pub llm_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub fallback: FallbackStrategy,
    pub tick_interval: Duration,
    pub poll_interval: Duration,
    pub min_call_interval: Duration,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub notify: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings from `lookup` (normally the process environment) layered
    /// over the file named by `NUDGE_CONFIG`, if any.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let file = match var("NUDGE_CONFIG") {
            Some(path) => load_file(Path::new(&path))?,
            None => FileSettings::default(),
        };

        let mode = match var("NUDGE_DECISION_MODE").or(file.decision_mode) {
            Some(raw) => raw.parse()?,
            None => DecisionMode::Remote,
        };
        let fallback = match var("NUDGE_FALLBACK").or(file.fallback) {
            Some(raw) => raw.parse()?,
            None => FallbackStrategy::Static,
        };

        let llm_url = var("LLM_URL").or(file.llm_url.filter(|v| !v.trim().is_empty()));
        let llm_model = var("LLM_MODEL").or(file.llm_model.filter(|v| !v.trim().is_empty()));

        if mode == DecisionMode::Remote {
            if llm_url.is_none() {
                bail!("LLM_URL must be set when the decision mode is remote");
            }
            if llm_model.is_none() {
                bail!("LLM_MODEL must be set when the decision mode is remote");
            }
        }

        let secs = |key: &str, file_value: Option<u64>, default: u64| -> Result<Duration> {
            Ok(Duration::from_secs(number(var(key), key, file_value, default)?))
        };

        let settings = Self {
            mode,
            llm_url,
            llm_model,
            llm_api_key: var("LLM_API_KEY").or(file.llm_api_key),
            fallback,
            tick_interval: secs("NUDGE_TICK_SECS", file.tick_secs, 2)?,
            poll_interval: secs("NUDGE_POLL_SECS", file.poll_secs, 2)?,
            min_call_interval: Duration::from_millis(number(
                var("NUDGE_MIN_CALL_INTERVAL_MS"),
                "NUDGE_MIN_CALL_INTERVAL_MS",
                file.min_call_interval_ms,
                1000,
            )?),
            request_timeout: secs("NUDGE_REQUEST_TIMEOUT_SECS", file.request_timeout_secs, 20)?,
            probe_timeout: secs("NUDGE_PROBE_TIMEOUT_SECS", file.probe_timeout_secs, 5)?,
            notify: match var("NUDGE_NOTIFY") {
                Some(raw) => parse_flag(&raw)?,
                None => file.notify.unwrap_or(true),
            },
        };

        if settings.tick_interval.is_zero() || settings.poll_interval.is_zero() {
            bail!("tick and poll intervals must be greater than zero");
        }

        Ok(settings)
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        let base_url = self
            .llm_url
            .clone()
            .ok_or_else(|| anyhow!("LLM_URL must be set"))?;
        let model = self
            .llm_model
            .clone()
            .ok_or_else(|| anyhow!("LLM_MODEL must be set"))?;

        Ok(EngineConfig {
            base_url,
            model,
            api_key: self.llm_api_key.clone(),
            request_timeout: self.request_timeout,
            probe_timeout: self.probe_timeout,
            min_call_interval: self.min_call_interval,
            fallback: self.fallback,
        })
    }
}

fn load_file(path: &Path) -> Result<FileSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse settings in {}", path.display()))
}

fn number(raw: Option<String>, key: &str, file_value: Option<u64>, default: u64) -> Result<u64> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        None => Ok(file_value.unwrap_or(default)),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("invalid boolean flag '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn remote_mode_requires_url_and_model() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("LLM_URL"));

        let err =
            Settings::from_lookup(lookup(&[("LLM_URL", "http://127.0.0.1:1234")])).unwrap_err();
        assert!(err.to_string().contains("LLM_MODEL"));

        let err =
            Settings::from_lookup(lookup(&[("LLM_URL", "  "), ("LLM_MODEL", "m")])).unwrap_err();
        assert!(err.to_string().contains("LLM_URL"));
    }

    #[test]
    fn defaults_when_configured() {
        let settings = Settings::from_lookup(lookup(&[
            ("LLM_URL", "http://127.0.0.1:1234/"),
            ("LLM_MODEL", "local-model"),
        ]))
        .unwrap();

        assert_eq!(settings.mode, DecisionMode::Remote);
        assert_eq!(settings.fallback, FallbackStrategy::Static);
        assert_eq!(settings.tick_interval, Duration::from_secs(2));
        assert_eq!(settings.min_call_interval, Duration::from_secs(1));
        assert_eq!(settings.request_timeout, Duration::from_secs(20));
        assert!(settings.notify);

        let engine = settings.engine_config().unwrap();
        assert_eq!(engine.model, "local-model");
        assert_eq!(engine.api_key, None);
    }

    #[test]
    fn rules_mode_needs_no_service() {
        let settings = Settings::from_lookup(lookup(&[
            ("NUDGE_DECISION_MODE", "rules"),
            ("NUDGE_FALLBACK", "rules"),
            ("NUDGE_NOTIFY", "off"),
        ]))
        .unwrap();

        assert_eq!(settings.mode, DecisionMode::Rules);
        assert_eq!(settings.fallback, FallbackStrategy::Rules);
        assert!(!settings.notify);
        assert!(settings.engine_config().is_err());
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = Settings::from_lookup(lookup(&[
            ("NUDGE_DECISION_MODE", "rules"),
            ("NUDGE_TICK_SECS", "two"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("NUDGE_TICK_SECS"));

        assert!(Settings::from_lookup(lookup(&[
            ("NUDGE_DECISION_MODE", "rules"),
            ("NUDGE_POLL_SECS", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let dir = std::env::temp_dir()
            .join(format!("nudgefocus-settings-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(
            &path,
            r#"{"llm_url": "http://file:1234", "llm_model": "file-model", "tick_secs": 7, "notify": false}"#,
        )
        .unwrap();

        let settings = Settings::from_lookup(lookup(&[
            ("NUDGE_CONFIG", path.to_str().unwrap()),
            ("LLM_MODEL", "env-model"),
        ]))
        .unwrap();

        assert_eq!(settings.llm_url.as_deref(), Some("http://file:1234"));
        assert_eq!(settings.llm_model.as_deref(), Some("env-model"));
        assert_eq!(settings.tick_interval, Duration::from_secs(7));
        assert!(!settings.notify);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = Settings::from_lookup(lookup(&[("NUDGE_CONFIG", "/nonexistent/nudge.json")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/nudge.json"));
    }
}
