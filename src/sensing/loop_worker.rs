use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::Observation;
use crate::session::SessionController;

use super::probe::{ActivityProbe, ObservationAssembler};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

const CAPTURE_TIMEOUT_SECS: u64 = 10;

/// Samples the probe every `poll_interval` and feeds the ingestion path until cancelled.
/// A failed or slow sample is logged and the loop picks up on the next tick.
pub async fn sensing_loop(
    probe: Arc<dyn ActivityProbe>,
    controller: SessionController,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sampler = Sampler::new(probe);
    let capture_timeout = Duration::from_secs(CAPTURE_TIMEOUT_SECS);
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel_token.cancelled() => break,
        }

        let started = Instant::now();
        let sample = tokio::select! {
            sample = sampler.next(capture_timeout) => sample,
            _ = cancel_token.cancelled() => break,
        };

        let observation = match sample {
            Ok(Sample::Ready(observation)) => observation,
            Ok(Sample::Busy) => {
                log_warn!("previous capture still running, skipping tick");
                continue;
            }
            Ok(Sample::TimedOut) => {
                log_warn!("sensing sample timeout (> {}s)", CAPTURE_TIMEOUT_SECS);
                continue;
            }
            Err(err) => {
                log_error!("sensing sample failed: {err:?}");
                continue;
            }
        };

        let app = observation.app_name().to_string();
        let idle_ms = observation.idle_ms;
        let result = tokio::select! {
            result = controller.ingest(observation) => result,
            _ = cancel_token.cancelled() => break,
        };

        cycles = cycles.wrapping_add(1);
        log_info!(
            "cycle {} sent: {} (idle {}ms) -> {} in {}ms",
            cycles,
            app,
            idle_ms,
            result.policy.action.as_str(),
            started.elapsed().as_millis()
        );
    }

    log_info!("sensing loop shutting down after {} cycles", cycles);
}

enum Sample {
    Ready(Observation),
    /// A capture that timed out earlier has not returned yet.
    Busy,
    TimedOut,
}

/// Runs probe captures on the blocking pool, at most one at a time. A capture
/// that outlives its timeout stays in `pending` until it returns.
struct Sampler {
    probe: Arc<dyn ActivityProbe>,
    assembler: Arc<Mutex<ObservationAssembler>>,
    pending: Option<JoinHandle<Result<Observation>>>,
}

impl Sampler {
    fn new(probe: Arc<dyn ActivityProbe>) -> Self {
        Self {
            probe,
            assembler: Arc::new(Mutex::new(ObservationAssembler::new())),
            pending: None,
        }
    }

    async fn next(&mut self, timeout: Duration) -> Result<Sample> {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                self.pending = Some(handle);
                return Ok(Sample::Busy);
            }
            // Late result of a timed-out capture; its readings are stale.
        }

        let probe = self.probe.clone();
        let assembler = self.assembler.clone();
        let mut handle = tokio::task::spawn_blocking(move || -> Result<Observation> {
            let mut guard = assembler
                .lock()
                .map_err(|_| anyhow!("observation assembler lock poisoned"))?;
            Ok(guard.collect(probe.as_ref()))
        });

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(joined) => {
                let observation = joined.context("sensing worker join failed")??;
                Ok(Sample::Ready(observation))
            }
            Err(_) => {
                self.pending = Some(handle);
                Ok(Sample::TimedOut)
            }
        }
    }
}
