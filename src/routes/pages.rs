use std::sync::Arc;

use axum::{Extension, Json, Router, routing::get};
use serde::Serialize;

use crate::routes::signup::DASHBOARD_PATH;
use crate::theme::{Theme, ThemeToggle};

const MENU_TITLE: &str = "SupportTWP";

pub fn router() -> Router {
    Router::new()
        .route("/", get(landing))
        .route(DASHBOARD_PATH, get(dashboard))
}

#[derive(Debug, Serialize)]
pub struct Link {
    label: &'static str,
    href: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LandingPage {
    title: &'static str,
    tagline: &'static str,
    links: [Link; 2],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardShell {
    menu_title: &'static str,
    greeting: &'static str,
    theme: Theme,
}

pub async fn landing() -> Json<LandingPage> {
    Json(LandingPage {
        title: "SupportME",
        tagline: "The best dashboard for twp",
        links: [
            Link {
                label: "Log in",
                href: "/login",
            },
            Link {
                label: "Sign Up",
                href: "/sign-up",
            },
        ],
    })
}

pub async fn dashboard(Extension(theme): Extension<Arc<ThemeToggle>>) -> Json<DashboardShell> {
    Json(DashboardShell {
        menu_title: MENU_TITLE,
        greeting: "Welcome back",
        theme: theme.current(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::config::AppConfig;
    use crate::routes::test_support::{app, app_with, get, json_body, send};
    use crate::theme::Theme;

    #[tokio::test]
    async fn test_landing_links_to_sign_up() {
        let (status, response) = send(app(), get("/")).await;
        assert_eq!(status, StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["title"], "SupportME");
        assert_eq!(body["links"][1]["href"], "/sign-up");
    }

    #[tokio::test]
    async fn test_dashboard_reports_configured_theme() {
        let config = AppConfig {
            initial_theme: Theme::Dark,
            ..AppConfig::default()
        };
        let (status, response) = send(app_with(&config), get("/dashboard")).await;
        assert_eq!(status, StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["menuTitle"], "SupportTWP");
        assert_eq!(body["theme"], "dark");
    }
}
