//! A/V Receiver Application
//!
//! Handshakes with the sender, plays the incoming stream, and records it
//! to timestamped AVI/WAV files. Stops on Ctrl+C or `q` + Enter.

use anyhow::{Context, Result};
use std::io::BufRead;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_av_streamer::{
    audio::{buffer::create_shared_queue, playback::SpeakerPlayback, SpeakerSink},
    config::AppConfig,
    constants::SERVER_PORT,
    net::bind_ephemeral,
    pipeline::ReceiverPipeline,
    video::{recorder::AviRecorder, SoftwareDisplay},
};
use lan_av_streamer::audio::recording::timestamped_name;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting A/V Receiver");

    let config = AppConfig::load_or_default().context("loading configuration")?;

    // Sender address from args, or ask interactively
    let server_ip: IpAddr = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("invalid sender address argument")?,
        None => prompt_server_ip()?,
    };
    let server_addr = SocketAddr::new(server_ip, config.network.port);

    let cancel = Arc::new(AtomicBool::new(false));

    // Ctrl+C and the stop key both set the same flag; the loop notices
    // at the next iteration boundary and runs finalization
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping receiver...");
            cancel_signal.store(true, Ordering::SeqCst);
        }
    });

    let cancel_key = cancel.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                    tracing::info!("stop key pressed");
                    cancel_key.store(true, Ordering::SeqCst);
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    });

    println!("Receiving... press 'q' then Enter (or Ctrl+C) to stop and save recordings.");

    let pipeline_cancel = cancel.clone();
    let recordings = tokio::task::spawn_blocking(move || -> Result<_> {
        let socket = bind_ephemeral().context("binding receiver socket")?;

        // Playback stream lives on the loop's thread
        let playback_queue = create_shared_queue(64);
        let playback = SpeakerPlayback::start(config.audio.sample_rate, playback_queue)
            .context("opening audio output")?;

        let video_path = config
            .recording
            .output_dir
            .join(timestamped_name("recorded", "avi"));
        let audio_path = config
            .recording
            .output_dir
            .join(timestamped_name("audio", "wav"));
        let recorder = AviRecorder::new(video_path, config.recording.fps, config.video.jpeg_quality);

        let mut pipeline = ReceiverPipeline::new(
            socket,
            SoftwareDisplay::new(),
            SpeakerSink::new(playback),
            recorder,
            audio_path,
            &config,
        );

        pipeline.handshake(server_addr)?;
        let recordings = pipeline.run(&pipeline_cancel)?;
        Ok(recordings)
    })
    .await
    .context("receiver pipeline panicked")??;

    match &recordings.video {
        Some(path) => println!("Saved video: {}", path.display()),
        None => println!("No video recorded."),
    }
    match &recordings.audio {
        Some(path) => println!("Saved audio: {}", path.display()),
        None => println!("No audio recorded."),
    }

    tracing::info!("receiver stopped");
    Ok(())
}

fn prompt_server_ip() -> Result<IpAddr> {
    use std::io::Write;

    print!("Enter Sender IP (port {}): ", SERVER_PORT);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    line.trim().parse().context("invalid IP address")
}
