//! A/V Sender Application
//!
//! Captures camera + microphone, gates silence, and streams framed
//! JPEG/PCM datagrams to every viewer that handshakes.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_av_streamer::{
    audio::{buffer::create_shared_queue, capture::MicCapture, MicSource},
    config::AppConfig,
    net::bind_udp,
    pipeline::SenderPipeline,
    video::CameraSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting A/V Sender");

    let config = AppConfig::load_or_default().context("loading configuration")?;

    // Camera index from args, default 0
    let camera_index: u32 = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()
        .context("invalid camera index argument")?
        .unwrap_or(0);

    let bind_addr = SocketAddr::new(config.network.bind_address, config.network.port);
    let socket = bind_udp(bind_addr).context("binding sender socket")?;
    tracing::info!("listening for handshakes on {}", bind_addr);

    let cancel = Arc::new(AtomicBool::new(false));

    // Cooperative cancellation on Ctrl+C
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping sender...");
            cancel_signal.store(true, Ordering::SeqCst);
        }
    });

    let pipeline_cancel = cancel.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<()> {
        // Fatal setup: no camera or microphone means no run at all.
        // Devices are opened on the loop's own thread and released with
        // the pipeline on every exit path.
        let camera = CameraSource::open(camera_index).context("opening camera")?;

        let capture_queue = create_shared_queue(64);
        let mic = MicCapture::start(
            config.audio.sample_rate,
            config.audio.chunk_samples,
            capture_queue,
        )
        .context("opening microphone")?;

        let mut pipeline = SenderPipeline::new(socket, camera, MicSource::new(mic), &config);
        pipeline.run(&pipeline_cancel)?;
        Ok(())
    })
    .await
    .context("sender pipeline panicked")?;

    result?;
    tracing::info!("sender stopped");
    Ok(())
}
