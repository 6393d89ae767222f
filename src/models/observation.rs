use serde::{Deserialize, Deserializer, Serialize};

/// Point-in-time snapshot of what the user is doing.
///
/// Every field tolerates `null` on the wire and falls back to its default, so
/// partially populated payloads from the probes still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub active_app: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub idle_ms: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ocr: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_detected: bool,
    /// Raw identifier reported by the phone watcher, e.g. a foreground package name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    /// Base64-encoded PNG.
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screenshot_error: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Observation {
    pub fn app_name(&self) -> &str {
        self.active_app
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("unknown")
    }

    /// Either the phone watcher flagged use or it reported a foreground identifier.
    pub fn phone_in_use(&self) -> bool {
        self.phone_detected || !self.phone.trim().is_empty()
    }

    pub fn screenshot(&self) -> Option<&str> {
        self.screenshot.as_deref().filter(|data| !data.is_empty())
    }

    pub fn screenshot_len(&self) -> usize {
        self.screenshot().map(str::len).unwrap_or(0)
    }

    /// Lowercased app name, window title and URL, used by the fallback rule table.
    pub fn surface_text(&self) -> String {
        [self.active_app.as_deref().unwrap_or(""), &self.title, &self.url]
            .join(" ")
            .to_lowercase()
    }

    /// Lowercased window title, URL and OCR text, used by the rule-only classifier.
    pub fn content_text(&self) -> String {
        [self.title.as_str(), &self.url, &self.ocr]
            .join(" ")
            .to_lowercase()
    }

    /// Copy without the screenshot payload, for status views and logs.
    pub fn redacted(&self) -> Self {
        Self {
            screenshot: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_fall_back_to_defaults() {
        let obs: Observation = serde_json::from_str(
            r#"{"active_app": null, "title": null, "url": null, "idle_ms": null,
                "ocr": null, "phone": null, "phone_detected": null, "screenshot": null}"#,
        )
        .unwrap();

        assert_eq!(obs, Observation::default());
        assert_eq!(obs.app_name(), "unknown");
    }

    #[test]
    fn negative_idle_is_rejected() {
        let result = serde_json::from_str::<Observation>(r#"{"idle_ms": -5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn phone_identifier_counts_as_use() {
        let obs = Observation {
            phone: "jp.youtube".into(),
            ..Default::default()
        };
        assert!(obs.phone_in_use());

        let blank = Observation {
            phone: "   ".into(),
            ..Default::default()
        };
        assert!(!blank.phone_in_use());
    }

    #[test]
    fn empty_screenshot_is_absent() {
        let obs = Observation {
            screenshot: Some(String::new()),
            ..Default::default()
        };
        assert!(obs.screenshot().is_none());
        assert_eq!(obs.screenshot_len(), 0);
    }
}
