//! Signaling server binary entry point
//!
//! Starts the companion-robot media-session server: WebSocket signaling,
//! WebRTC negotiation, and stored-video streaming.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: listen on 0.0.0.0:5001, serve assets/videos
//! cargo run -p companion-webrtc-server
//!
//! # Custom listen address and video directory
//! cargo run -p companion-webrtc-server -- \
//!   --listen-addr 0.0.0.0:5001 \
//!   --video-dir /srv/companion/videos \
//!   --stun-servers stun:stun.l.google.com:19302
//! ```

use clap::Parser;
use companion_webrtc::{ServerConfig, SignalingServer};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Companion media-session server
///
/// WebSocket signaling front end for WebRTC video sessions backed by a
/// directory of stored video files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Socket address to listen on
    #[arg(long, default_value = "0.0.0.0:5001", env = "COMPANION_LISTEN_ADDR")]
    listen_addr: String,

    /// Managed directory of video assets (created if absent)
    #[arg(long, default_value = "assets/videos", env = "COMPANION_VIDEO_DIR")]
    video_dir: PathBuf,

    /// STUN servers (comma-separated; empty for host candidates only)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "stun:stun.l.google.com:19302"
    )]
    stun_servers: Vec<String>,

    /// Maximum concurrent sessions
    #[arg(long, default_value_t = 32, env = "COMPANION_MAX_SESSIONS")]
    max_sessions: u32,

    /// Seconds an answer waits for ICE gathering before shipping partial
    #[arg(long, default_value_t = 5, env = "COMPANION_ICE_GATHER_TIMEOUT")]
    ice_gather_timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_handler = Arc::clone(&shutdown_flag);

    ctrlc::set_handler(move || {
        let was_already_set = shutdown_flag_handler.swap(true, Ordering::SeqCst);
        if was_already_set {
            eprintln!("shutdown already in progress, forcing immediate exit");
            std::process::exit(0);
        }
        eprintln!("shutdown signal received");
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("signaling-dispatch")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args, shutdown_flag))
}

async fn async_main(args: Args, shutdown_flag: Arc<AtomicBool>) -> anyhow::Result<()> {
    init_tracing();

    info!(
        version = companion_webrtc::version(),
        "companion media-session server starting"
    );

    let config = ServerConfig {
        listen_addr: args.listen_addr,
        video_dir: args.video_dir,
        stun_servers: args
            .stun_servers
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect(),
        max_sessions: args.max_sessions,
        ice_gather_timeout_secs: args.ice_gather_timeout_secs,
    };

    info!(
        listen_addr = %config.listen_addr,
        video_dir = %config.video_dir.display(),
        stun_servers = config.stun_servers.len(),
        max_sessions = config.max_sessions,
        "configuration loaded"
    );

    let server = SignalingServer::new(config)?;
    let handle = server.start().await?;

    info!(addr = %handle.local_addr(), "server running; press Ctrl+C to shut down");

    while !shutdown_flag.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }

    info!("shutting down");
    handle.shutdown().await;
    info!("server shut down gracefully");

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
