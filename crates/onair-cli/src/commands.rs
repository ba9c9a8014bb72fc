//! CLI command implementations

use crate::output::{format_output, format_state};
use anyhow::Context;
use onair_core::sim::{SimulatedEngineFactory, SimulatedSink, SimulatedViewport};
use onair_core::{EngineEvent, ErrorCategory, PlayRejection, PlayerConfig, PlayerController};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use url::Url;

/// Fatal engine error to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailKind {
    Network,
    Media,
    Other,
}

impl FailKind {
    fn category(self) -> ErrorCategory {
        match self {
            FailKind::Network => ErrorCategory::Network,
            FailKind::Media => ErrorCategory::Media,
            FailKind::Other => ErrorCategory::Other("injected".to_string()),
        }
    }
}

/// Options for `onair watch`
pub struct WatchOptions {
    pub url: Option<String>,
    pub config: Option<PathBuf>,
    pub idle_timeout_ms: Option<u64>,
    pub splash: bool,
    pub native: bool,
    pub autoplay_blocked: bool,
    pub fail: Option<FailKind>,
    pub run_for_ms: u64,
}

fn load_config(options: &WatchOptions) -> anyhow::Result<PlayerConfig> {
    let mut config = match &options.config {
        Some(path) => PlayerConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    if let Some(url) = &options.url {
        config.source_url = Url::parse(url).with_context(|| format!("invalid URL: {url}"))?;
    }
    if let Some(ms) = options.idle_timeout_ms {
        config.idle_timeout_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

/// Mount the controller on simulated capabilities and print its UI state
pub async fn watch(options: WatchOptions, format: &str) -> anyhow::Result<()> {
    let config = load_config(&options)?;
    let branding = config.branding.clone();

    println!("{} - {}", branding.channel_name, branding.live_label);
    println!("  Source: {}", config.source_url);
    if options.splash {
        println!("  {}...", branding.loading_label);
        tokio::time::sleep(config.splash_duration()).await;
    }

    let sink = if options.native {
        SimulatedSink::native()
    } else {
        SimulatedSink::new()
    };
    let sink = Arc::new(sink.with_play_delay(Duration::from_millis(80)));
    if options.autoplay_blocked {
        sink.push_play_outcome(Err(PlayRejection::NotAllowed));
    }
    let viewport = Arc::new(SimulatedViewport::new());
    let engines = Arc::new(SimulatedEngineFactory::new().with_auto_manifest());

    let (handle, task) =
        PlayerController::mount(config, sink.clone(), viewport, engines.clone())?;
    info!(session_id = %handle.id(), "Player mounted");

    let started = Instant::now();
    let mut states = handle.subscribe();
    println!("{}", format_state(&states.borrow_and_update(), started.elapsed(), format));

    let mut fail = options.fail;
    let fail_at = tokio::time::sleep(Duration::from_secs(1));
    tokio::pin!(fail_at);

    // A blocked autoplay waits for the viewer to press play
    let mut manual_play = options.autoplay_blocked;
    let click_at = tokio::time::sleep(Duration::from_millis(1500));
    tokio::pin!(click_at);

    let run_for = tokio::time::sleep(Duration::from_millis(options.run_for_ms));
    tokio::pin!(run_for);

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", format_state(&states.borrow_and_update(), started.elapsed(), format));
            }
            _ = &mut fail_at, if fail.is_some() => {
                if let Some(kind) = fail.take() {
                    info!(?kind, "Injecting fatal engine error");
                    engines.emit(EngineEvent::fatal(kind.category(), "injected by onair-cli"));
                }
            }
            _ = &mut click_at, if manual_play => {
                manual_play = false;
                info!("Simulating play click");
                handle.toggle_play()?;
            }
            _ = &mut run_for => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.unmount()?;
    task.await?;

    println!("\nSession summary:");
    println!("  Engines constructed: {}", engines.constructed());
    println!("  Engines alive: {}", engines.live_engines());
    println!("  Play calls: {}", sink.play_calls());
    println!("  Pause calls: {}", sink.pause_calls());
    println!("  Overlapping sink calls: {}", sink.overlapping_calls());

    Ok(())
}

/// Print the default configuration
pub fn show_config(format: &str) -> anyhow::Result<()> {
    let config = PlayerConfig::default();
    config.validate()?;
    println!("{}", format_output(&config, format));
    Ok(())
}
