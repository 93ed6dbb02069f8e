use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::security::json::ValidatedJson;
use crate::theme::{Theme, ThemeToggle};

pub fn router() -> Router {
    Router::new()
        .route("/theme", get(current_theme).put(set_theme))
        .route("/theme/toggle", post(toggle_theme))
}

#[derive(Debug, Serialize)]
pub struct ThemeState {
    theme: Theme,
    hint: &'static str,
}

impl From<Theme> for ThemeState {
    fn from(theme: Theme) -> Self {
        Self {
            theme,
            hint: theme.toggle_hint(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetThemeRequest {
    theme: Theme,
}

pub async fn current_theme(Extension(toggle): Extension<Arc<ThemeToggle>>) -> Json<ThemeState> {
    Json(toggle.current().into())
}

pub async fn set_theme(
    Extension(toggle): Extension<Arc<ThemeToggle>>,
    ValidatedJson(payload): ValidatedJson<SetThemeRequest>,
) -> Json<ThemeState> {
    toggle.set(payload.theme);
    tracing::debug!(theme = %payload.theme, "Theme set");
    Json(payload.theme.into())
}

pub async fn toggle_theme(Extension(toggle): Extension<Arc<ThemeToggle>>) -> Json<ThemeState> {
    let theme = toggle.toggle();
    tracing::debug!(theme = %theme, "Theme toggled");
    Json(theme.into())
}
