// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use gonggu_ai_router::{
    api::{start_server, AppState},
    config::RouterConfig,
    router::AiRouter,
    vision::Device,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// Flags override the environment. Environment values are read only by
// RouterConfig::from_env, which tolerates malformed entries.
#[derive(Parser, Debug)]
#[command(
    name = "gonggu-ai-router",
    version,
    about = "YOLO + Gemini tool recognition router"
)]
struct Args {
    /// HTTP listen port
    #[arg(long)]
    port: Option<u16>,

    /// Minimum quality score for returning the detector's answer directly
    #[arg(long)]
    threshold: Option<f32>,

    /// Inference device (cuda or cpu)
    #[arg(long)]
    device: Option<Device>,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    info!("🚀 Starting {}", gonggu_ai_router::version::get_version_string());
    info!("📦 BUILD VERSION: {}", gonggu_ai_router::version::VERSION);

    let mut config = RouterConfig::from_env();
    if let Some(port) = args.port {
        config.api_port = port;
    }
    if let Some(threshold) = args.threshold {
        config.quality_threshold = threshold;
    }
    if let Some(device) = args.device {
        config.device = device;
    }

    if let Err(e) = config.validate() {
        warn!("⚠️ Configuration problem: {} (router will not become ready)", e);
    }

    let addr: SocketAddr = format!("{}:{}", args.host, config.api_port)
        .parse()
        .context("Invalid bind address")?;

    let state = AppState::new(config.device);

    // Models load in the background; /analyze answers 503 until then.
    // A failed initialization is fatal.
    let (failed_tx, failed_rx) = oneshot::channel::<String>();
    let init_state = state.clone();
    tokio::spawn(async move {
        match AiRouter::from_config(&config).await {
            Ok(router) => {
                init_state.set_router(Arc::new(router)).await;
                info!("✅ AI router ready");
            }
            Err(e) => {
                error!("❌ AI router initialization failed: {}", e);
                init_state.set_init_error(e.to_string()).await;
                let _ = failed_tx.send(e.to_string());
            }
        }
    });

    tokio::select! {
        served = start_server(state, addr) => served,
        Ok(reason) = failed_rx => {
            anyhow::bail!("AI router initialization failed: {}", reason)
        }
    }
}
