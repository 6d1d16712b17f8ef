use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::app_state::AppState;

use super::handlers;

pub fn build_router(state: Arc<AppState>) -> Router {
    let plugin_path = format!("/api/plugin/{}", state.config.plugin_id);
    let protected_routes = Router::new()
        .route(&plugin_path, post(handlers::command))
        .route(
            &format!("{plugin_path}/settings"),
            get(handlers::settings).put(handlers::update_settings),
        )
        .route("/api/events", post(handlers::printer_event))
        .route("/api/push", get(handlers::push))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            super::middleware::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(state)
}

/// Serves the router on an ephemeral local port and returns its base url.
#[cfg(test)]
pub async fn spawn_test_server(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("test listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    tokio::spawn(async move {
        axum::serve(listener, build_router(state))
            .await
            .expect("test server should run");
    });
    format!("http://{addr}")
}
