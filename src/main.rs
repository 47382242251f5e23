//! Application entry point: terminal avatar chat.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create a current-thread [`tokio`] runtime.
//! 4. Build the provider gateway and the speech synthesizer (speaker output
//!    with the `playback` feature, silent timing otherwise).
//! 5. Build the chat orchestrator and its notification channel.
//! 6. Spawn the frame loop that animates the console avatar.
//! 7. Read commands and chat messages from stdin until `/quit` or EOF.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use avatar_chat::{
    app::{ConsoleAvatar, ConsoleCommand, HELP},
    audio::{AudioOutput, SilentOutput},
    avatar::{run_frame_loop, ExpressionAnimator},
    config::AppConfig,
    pipeline::{notification_channel, ChatOrchestrator, TurnOutcome},
    provider::ProviderGateway,
    tts::{SpeechClient, SpeechSynthesizer},
};

// ---------------------------------------------------------------------------
// Audio output
// ---------------------------------------------------------------------------

#[cfg(feature = "playback")]
fn speaker_output() -> Option<Arc<dyn AudioOutput>> {
    match avatar_chat::audio::CpalOutput::new() {
        Ok(output) => Some(Arc::new(output)),
        Err(e) => {
            log::warn!("speaker output unavailable ({e}); speech will be silent");
            None
        }
    }
}

#[cfg(not(feature = "playback"))]
fn speaker_output() -> Option<Arc<dyn AudioOutput>> {
    None
}

/// Speaker output when available, otherwise silent playback so the avatar
/// still moves for the length of each reply.
fn audio_output() -> Arc<dyn AudioOutput> {
    speaker_output().unwrap_or_else(|| {
        log::info!("using silent audio output");
        Arc::new(SilentOutput)
    })
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

async fn run(mut config: AppConfig) -> anyhow::Result<()> {
    let gateway = ProviderGateway::from_config(&config.endpoints);
    let speech = Arc::new(SpeechSynthesizer::new(
        Arc::new(SpeechClient::from_config(&config.endpoints, &config.speech)),
        audio_output(),
        config.speech.output_format.clone(),
    ));

    let (notice_tx, mut notice_rx) = notification_channel();
    let orchestrator = Arc::new(ChatOrchestrator::new(
        Arc::new(gateway),
        Arc::clone(&speech),
        config.provider.clone(),
        config.chat.clone(),
        notice_tx,
    ));

    // Frame loop
    let (stop_tx, stop_rx) = watch::channel(false);
    let animator = ExpressionAnimator::new(speech.speaking_state(), &config.avatar);
    let frames = tokio::spawn(run_frame_loop(
        animator,
        ConsoleAvatar::new(config.avatar.expression.clone()),
        config.avatar.frame_rate,
        stop_rx,
    ));

    // Notifications
    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            eprintln!("\n{notice}");
        }
    });

    println!(
        "avatar-chat: talking to {} (type /help for commands)",
        config.provider.provider
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Reset => orchestrator.reset(),
            ConsoleCommand::Save => {
                config.provider = orchestrator.config();
                match config.save() {
                    Ok(()) => println!("settings saved"),
                    Err(e) => eprintln!("failed to save settings: {e:#}"),
                }
            }
            ConsoleCommand::Chat(text) => {
                orchestrator.set_input(text);
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    if let TurnOutcome::Replied { reply, .. } = orchestrator.submit().await {
                        println!("\navatar> {reply}");
                    }
                });
            }
            settings => {
                if let Some(patch) = settings.into_patch() {
                    orchestrator.update_config(patch);
                    println!("settings updated");
                }
            }
        }
    }

    speech.stop().await;
    let _ = stop_tx.send(true);
    let _ = frames.await;
    log::info!("avatar-chat shutting down");
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("avatar-chat starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Runtime.  Network calls suspend the turn; the frame loop keeps ticking.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}
