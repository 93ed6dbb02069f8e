mod clock;
mod config;
mod errors;
mod logging;
mod routes;
mod security;
mod signup;
mod theme;

use std::{net::SocketAddr, sync::Arc};

use axum::serve;
use clock::SystemClock;
use config::AppConfig;
use routes::build_app;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let app = build_app(&config, Arc::new(SystemClock))
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "SupportTWP listening");

    serve(listener, app).await?;

    Ok(())
}
