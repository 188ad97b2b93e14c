mod config;
mod peer;
mod ws;

use std::env::args;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use webrtsp_client::peer::Peer;
use webrtsp_client::{Client, Runtime};

use crate::config::AppConfig;
use crate::peer::ProbePeer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("LOG"))
        .init();

    let config_file = args().nth(1).unwrap_or("player.yaml".to_string());
    let config = AppConfig::from_file(Path::new(&config_file))?;
    tracing::debug!(?config, "read configuration");

    let runtime = Arc::new(Runtime::new());

    tracing::info!(url = %config.server.url, "connecting");
    let transport = ws::connect(&config.server.url, &runtime).await;

    let client = Client::connect(
        transport,
        Box::new(|| Box::new(ProbePeer::new()) as Box<dyn Peer>),
        runtime.clone(),
    )
    .await?;

    if let Some(session_id) = client.session().session_id().await {
        tracing::info!(%session_id, "session playing");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    runtime.stop().await;

    Ok(())
}
