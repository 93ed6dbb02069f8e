use std::sync::Arc;

use axum::{Extension, Router, extract::DefaultBodyLimit, middleware};

use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::security;
use crate::theme::ThemeToggle;

pub mod pages;
pub mod signup;
pub mod theme;

pub fn create_router(config: &AppConfig) -> Router {
    tracing::debug!("Creating application router");
    Router::new()
        .merge(pages::router())
        .merge(signup::router(config.signup_rate_limit.clone()))
        .merge(theme::router())
        .fallback(not_found)
}

/// Router with shared state and the security layers every response passes through.
pub fn build_app(config: &AppConfig, clock: SharedClock) -> Router {
    let theme = Arc::new(ThemeToggle::new(config.initial_theme));

    create_router(config)
        .layer(middleware::from_fn(security::headers::set_security_headers))
        .layer(DefaultBodyLimit::max(security::json::MAX_BODY_SIZE_BYTES))
        .layer(Extension(clock))
        .layer(Extension(theme))
}

async fn not_found() -> AppError {
    AppError::NotFound
}


#[cfg(test)]
mod tests {
    use super::test_support::{app, get, json_body, send};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, response) = send(app(), get("/nowhere")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        let body = json_body(response).await;
        assert_eq!(body["error"], "resource not found");
    }
}
