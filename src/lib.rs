pub mod api;
pub mod config;
pub mod reply;
pub mod upstream;

use std::{env, sync::Arc};

use axum::Router;

pub use config::{ApiStyle, AppConfig, RetryPolicy};

pub fn build_app(config: Arc<AppConfig>) -> Router {
    api::router(config)
}

pub fn server_port_from_env() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(3000)
}

pub async fn run_server(app: Router, port: u16) {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("bind failed");

    tracing::info!("listening on 0.0.0.0:{port}");
    axum::serve(listener, app).await.expect("server failed");
}
