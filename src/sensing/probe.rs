use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::Observation;

/// Foreground window as reported by the OS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub active_app: Option<String>,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneReading {
    pub detected: bool,
    pub identifier: String,
}

/// OS-specific activity signals. Implementations may block; the sensing loop
/// calls them off the async runtime.
pub trait ActivityProbe: Send + Sync + 'static {
    fn active_window(&self) -> Result<WindowInfo>;

    fn idle_ms(&self) -> Result<u64>;

    /// Base64 PNG of the current screen, if capture is supported.
    fn screenshot(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn phone(&self) -> Result<PhoneReading> {
        Ok(PhoneReading::default())
    }

    fn ocr_text(&self) -> Result<String> {
        Ok(String::new())
    }
}

const MAX_SCREENSHOT_ERRORS: u32 = 5;

/// Builds observations from a probe, reusing the last good reading of any
/// signal that fails. Screenshot capture is skipped after repeated failures.
pub struct ObservationAssembler {
    last_window: WindowInfo,
    last_idle_ms: u64,
    last_screenshot: Option<String>,
    screenshot_errors: u32,
    window_errors: u32,
    idle_errors: u32,
}

impl Default for ObservationAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationAssembler {
    pub fn new() -> Self {
        Self {
            last_window: WindowInfo::default(),
            last_idle_ms: 0,
            last_screenshot: None,
            screenshot_errors: 0,
            window_errors: 0,
            idle_errors: 0,
        }
    }

    pub fn screenshot_disabled(&self) -> bool {
        self.screenshot_errors >= MAX_SCREENSHOT_ERRORS
    }

    pub fn error_count(&self) -> u32 {
        self.window_errors + self.idle_errors + self.screenshot_errors
    }

    pub fn collect(&mut self, probe: &dyn ActivityProbe) -> Observation {
        match probe.active_window() {
            Ok(window) => {
                self.last_window = window;
                self.window_errors = 0;
            }
            Err(err) => {
                self.window_errors += 1;
                log::warn!("active window probe failed: {err:#}");
            }
        }

        match probe.idle_ms() {
            Ok(idle_ms) => {
                self.last_idle_ms = idle_ms;
                self.idle_errors = 0;
            }
            Err(err) => {
                self.idle_errors += 1;
                log::warn!("idle probe failed: {err:#}");
            }
        }

        let mut screenshot_error = String::new();
        if !self.screenshot_disabled() {
            match probe.screenshot() {
                Ok(Some(png)) if !png.is_empty() => {
                    self.last_screenshot = Some(png);
                    self.screenshot_errors = 0;
                }
                Ok(_) => {}
                Err(err) => {
                    self.screenshot_errors += 1;
                    screenshot_error = format!("{err:#}");
                }
            }
        }

        let phone = probe.phone().unwrap_or_else(|err| {
            log::warn!("phone probe failed: {err:#}");
            PhoneReading::default()
        });
        let ocr = probe.ocr_text().unwrap_or_default();

        Observation {
            active_app: self.last_window.active_app.clone(),
            title: self.last_window.title.clone(),
            url: self.last_window.url.clone(),
            idle_ms: self.last_idle_ms,
            ocr,
            phone_detected: phone.detected,
            phone: phone.identifier,
            screenshot: self.last_screenshot.clone(),
            screenshot_error,
        }
    }
}
