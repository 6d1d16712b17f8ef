use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    config::settings::{ConfigurationProvider, PluginSettings},
    core::{errors::AppError, message::StreamCommand, state::StreamState},
    stream::service::PrinterEvent,
};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    stream: StreamState,
}

#[derive(Deserialize)]
pub struct PrinterEventRequest {
    event: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stream = state.streamer.lock().await.state();
    Json(HealthResponse {
        status: "ok",
        stream,
    })
}

/// Runs a stream command. The outcome only travels over the push channel.
pub async fn command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<StreamCommand>,
) -> Result<StatusCode, AppError> {
    let settings = state.settings.snapshot();
    let message = {
        let mut streamer = state.streamer.lock().await;
        streamer.handle_command(command, &settings).await
    };
    state.publish(message);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn settings(State(state): State<Arc<AppState>>) -> Json<PluginSettings> {
    Json(state.settings.snapshot())
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<PluginSettings>,
) -> Result<Json<PluginSettings>, AppError> {
    if settings.stream_url.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "stream_url cannot be empty",
        ));
    }

    state.settings.replace(settings.clone());
    state.push.send_settings_updated();
    info!("plugin settings updated");
    Ok(Json(settings))
}

pub async fn printer_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PrinterEventRequest>,
) -> Result<StatusCode, AppError> {
    let Some(event) = PrinterEvent::parse(&payload.event) else {
        return Ok(StatusCode::ACCEPTED);
    };

    let settings = state.settings.snapshot();
    let message = {
        let mut streamer = state.streamer.lock().await;
        streamer.handle_printer_event(event, &settings).await
    };
    if let Some(message) = message {
        info!("printer event {event:?} handled");
        state.publish(message);
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn push(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = BroadcastStream::new(state.push.subscribe()).filter_map(|event| match event {
        Ok(event) => Some(Event::default().json_data(&event)),
        Err(err) => {
            warn!("push subscriber fell behind: {err}");
            None
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
