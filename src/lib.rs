pub mod decision;
pub mod driver;
pub mod models;
pub mod notify;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use decision::{Decider, NudgeEngine};
use notify::{LogSink, Notifier};
use sensing::SensingController;
use session::SessionController;
use settings::{DecisionMode, Settings};

/// Builds the decision source once; everything downstream shares it.
pub fn build_decider(settings: &Settings) -> Result<Decider> {
    match settings.mode {
        DecisionMode::Rules => Ok(Decider::Rules),
        DecisionMode::Remote => {
            let engine = NudgeEngine::new(settings.engine_config()?)?;
            Ok(Decider::Remote(Arc::new(engine)))
        }
    }
}

pub fn build_controller(settings: &Settings) -> Result<SessionController> {
    let decider = build_decider(settings)?;
    let notifier = Notifier::new(Arc::new(LogSink), settings.notify);
    Ok(SessionController::new(
        decider,
        notifier,
        settings.tick_interval,
    ))
}

/// Sensing controller polling at the configured interval. OS probes are supplied
/// by the embedding application through `start_sensing`.
pub fn build_sensing(settings: &Settings) -> SensingController {
    SensingController::new(settings.poll_interval)
}

pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("nudgefocus starting up...");

    let settings = Settings::from_env()?;
    let controller = build_controller(&settings)?;

    if let Some(engine) = controller.decider().engine() {
        let available = engine.is_available().await;
        log::info!(
            "Decision service {} ({}) available: {}",
            engine.base_url(),
            engine.model(),
            available
        );
    } else {
        log::info!("Rule-only decision mode");
    }

    controller.ensure_ticker().await;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let served = driver::serve(&controller, stdin, stdout).await;

    controller.shutdown().await;
    log::info!("nudgefocus shutting down");
    served
}
