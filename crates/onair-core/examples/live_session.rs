//! Live session example
//!
//! Mounts the controller on the simulated engine and sink, drives a few
//! user intents and prints the resulting UI state.
//!
//! Run with: cargo run -p onair-core --example live_session

use onair_core::sim::{SimulatedEngineFactory, SimulatedSink, SimulatedViewport};
use onair_core::{EngineEvent, ErrorCategory, PlayerConfig, PlayerController};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> onair_core::Result<()> {
    println!("OnAir Core - Live Session Example");
    println!("=================================\n");

    let config = PlayerConfig {
        idle_timeout_ms: 1500,
        ..Default::default()
    };
    println!("Source: {}", config.source_url);
    println!("Engine: {:?}\n", config.engine);

    let sink = Arc::new(SimulatedSink::new());
    let engines = Arc::new(SimulatedEngineFactory::new().with_auto_manifest());
    let (player, task) = PlayerController::mount(
        config,
        sink.clone(),
        Arc::new(SimulatedViewport::new()),
        engines.clone(),
    )?;

    let pause = Duration::from_millis(200);
    tokio::time::sleep(pause).await;
    println!("After mount:        {:?}", player.state());

    player.toggle_mute()?;
    tokio::time::sleep(pause).await;
    println!("After unmute:       {:?}", player.state());

    player.toggle_play()?;
    tokio::time::sleep(pause).await;
    println!("After pause:        {:?}", player.state());

    engines.emit(EngineEvent::fatal(ErrorCategory::Other("mux".into()), "example"));
    tokio::time::sleep(pause).await;
    println!("Engines constructed after rebind: {}", engines.constructed());

    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("After idle window:  {:?}", player.state());

    player.unmount()?;
    let _ = task.await;
    println!("\nPlay calls: {}, overlapping: {}", sink.play_calls(), sink.overlapping_calls());

    Ok(())
}
