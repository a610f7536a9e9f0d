//! Router and HTTP handlers.

use std::net::SocketAddr;

use {
    axum::{
        Router,
        extract::{ConnectInfo, Path, State, WebSocketUpgrade},
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::get,
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::debug,
};

use {
    chatspout_protocol::{ChannelKey, Envelope},
    chatspout_relay::SourceError,
    serde_json::json,
};

use crate::{state::AppState, ws::handle_connection};

/// Build the relay router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/health/downstream", get(downstream_health_handler))
        .route("/{platform}/{streamer}/profile", get(profile_handler))
        .route("/{platform}/{streamer}/chat", get(chat_upgrade_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": 200,
        "message": "Up",
        "connections": state.registry.total_subscribers(),
    }))
}

/// Check the platforms this relay extracts from. A platform is "Up" only when
/// its landing page answers with a 2xx status.
async fn downstream_health_handler() -> impl IntoResponse {
    let (kick, twitch) = tokio::join!(
        site_status("https://kick.com"),
        site_status("https://twitch.tv"),
    );
    Json(json!({
        "status": 200,
        "message": "Up",
        "downstream": { "twitch": twitch, "kick": kick },
    }))
}

async fn site_status(url: &str) -> &'static str {
    match reqwest::get(url).await {
        Ok(resp) => {
            let label = reachability(resp.status());
            if label == "Down" {
                debug!(%url, status = %resp.status(), "downstream check failed");
            }
            label
        },
        Err(err) => {
            debug!(%url, error = %err, "downstream check failed");
            "Down"
        },
    }
}

fn reachability(status: StatusCode) -> &'static str {
    if status.is_success() { "Up" } else { "Down" }
}

async fn profile_handler(
    Path((platform, streamer)): Path<(String, String)>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let key = match ChannelKey::parse(&platform, &streamer) {
        Ok(key) => key,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(Envelope::bad_request(err.to_string())),
            );
        },
    };

    let Some(url) = key.platform.site_url(&key.streamer) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(Envelope::bad_request(format!(
                "call to {} is unimplemented",
                key.platform
            ))),
        );
    };

    match state.profiles.profile_image(key.platform, &url).await {
        Ok(image) => (StatusCode::OK, Json(Envelope::ok(image))),
        Err(err @ (SourceError::Navigation(_) | SourceError::Timeout(_))) => {
            debug!(channel = %key, error = %err, "profile page unreachable");
            (
                StatusCode::BAD_REQUEST,
                Json(Envelope::bad_request(format!("error on visiting {url}"))),
            )
        },
        Err(err) => {
            debug!(channel = %key, error = %err, "profile lookup failed");
            (
                StatusCode::BAD_REQUEST,
                Json(Envelope::bad_request(format!(
                    "error on fetching {url} profile"
                ))),
            )
        },
    }
}

async fn chat_upgrade_handler(
    Path((platform, streamer)): Path<(String, String)>,
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> axum::response::Response {
    let key = match ChannelKey::parse(&platform, &streamer) {
        Ok(key) => key,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(Envelope::bad_request(err.to_string())),
            )
                .into_response();
        },
    };

    ws.on_upgrade(move |socket| handle_connection(socket, state, key, addr))
}

#[cfg(test)]
mod tests {
    use {super::reachability, reqwest::StatusCode};

    #[test]
    fn only_success_statuses_count_as_up() {
        assert_eq!(reachability(StatusCode::OK), "Up");
        assert_eq!(reachability(StatusCode::NO_CONTENT), "Up");
        assert_eq!(reachability(StatusCode::FORBIDDEN), "Down");
        assert_eq!(reachability(StatusCode::INTERNAL_SERVER_ERROR), "Down");
    }
}
