use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::session::SessionController;

use super::loop_worker::sensing_loop;
use super::probe::ActivityProbe;

pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    poll_interval: Duration,
}

impl SensingController {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            handle: None,
            cancel_token: None,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start_sensing(
        &mut self,
        probe: Arc<dyn ActivityProbe>,
        controller: SessionController,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sensing already active");
        }

        info!("starting sensing loop every {:?}", self.poll_interval);

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sensing_loop(
            probe,
            controller,
            self.poll_interval,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sensing loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}
