//! HTTP endpoints next to the WebSocket route.
//!
//! The home page bootstraps a browser client; the stats endpoint exposes the
//! hub's counters.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;
use crate::types::HubStats;

/// File inside the assets dir served at `/`
pub const HOME_PAGE: &str = "home.html";

/// Placeholder in the home page replaced by the request's host
const HOST_PLACEHOLDER: &str = "{{host}}";

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub hub: HubStats,
    pub started_at: String,
}

/// Serve the home page with the caller's host filled in, so the page's
/// script opens its socket against the same server.
///
/// GET /
pub async fn home(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let path = state.config.assets_dir.join(HOME_PAGE);
    match tokio::fs::read_to_string(&path).await {
        Ok(template) => Html(render_home(&template, host)).into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Home page unavailable: {}", e);
            (StatusCode::NOT_FOUND, "Home page not found").into_response()
        }
    }
}

/// Hub counters plus process start time.
///
/// GET /api/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Response {
    match state.hub.stats().await {
        Ok(hub) => Json(StatsResponse {
            hub,
            started_at: state.started_at.to_rfc3339(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to read hub stats: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

fn render_home(template: &str, host: &str) -> String {
    template.replace(HOST_PLACEHOLDER, &escape_html(host))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_home_substitutes_host() {
        let page = render_home("new WebSocket(\"ws://{{host}}/ws\")", "localhost:8080");
        assert_eq!(page, "new WebSocket(\"ws://localhost:8080/ws\")");
    }

    #[test]
    fn test_render_home_escapes_host() {
        let page = render_home("<p>{{host}}</p>", "<script>\"x\"</script>");
        assert_eq!(page, "<p>&lt;script&gt;&quot;x&quot;&lt;/script&gt;</p>");
    }

    #[test]
    fn test_stats_response_is_flat() {
        let response = StatsResponse {
            hub: HubStats {
                connections: 3,
                ..HubStats::default()
            },
            started_at: "2024-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["connections"], 3);
        assert_eq!(json["started_at"], "2024-01-01T00:00:00+00:00");
    }
}
