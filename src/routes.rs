//! HTTP routes: WebSocket upgrade into the hub, health and the browser client.

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use wshub::Hub;

use crate::transport::AxumTransport;

/// Query parameters of the upgrade route.
#[derive(Debug, Deserialize)]
pub struct HubQuery {
    /// Identifier chosen by the browser client.
    pub client_id: Option<String>,
}

/// Build the application router. Unmatched paths are served from
/// `static_dir`, so `/` loads the browser client.
pub fn build_router(hub: Hub, static_dir: &str) -> Router {
    Router::new()
        .route("/hub", get(hub_handler))
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

/// GET /hub?client_id={id}: WebSocket upgrade
async fn hub_handler(
    State(hub): State<Hub>,
    Query(query): Query<HubQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(client_id) = query.client_id.filter(|id| !id.is_empty()) else {
        tracing::warn!("Url param 'client_id' is missing");
        return (StatusCode::BAD_REQUEST, "missing client_id").into_response();
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = hub.connect(client_id, AxumTransport::new(socket)).await {
            tracing::warn!(error = %e, "Hub refused connection");
        }
    })
}

/// GET /health
async fn health_handler(State(hub): State<Hub>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "hub_state": hub.state(),
        "connections": hub.connection_count(),
        "metrics": hub.metrics(),
    }))
}
