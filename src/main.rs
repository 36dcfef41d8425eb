use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use night_chat::{build_app, run_server, server_port_from_env, AppConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    if config.hf_token.is_none() {
        tracing::warn!("HF_TOKEN is not set; POST /chat will answer 500 until it is configured");
    }
    tracing::info!("relaying to {} ({:?} style)", config.base_url, config.style);

    let app = build_app(Arc::new(config));
    run_server(app, server_port_from_env()).await;
}
