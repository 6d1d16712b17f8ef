mod app_state;
mod config;
mod core;
mod notify;
mod panel;
mod push;
mod stream;
mod web;

use std::{sync::Arc, time::Duration};

use app_state::AppState;
use config::AppConfig;
use notify::{NotificationEvent, telegram::TelegramNotifier};
use stream::{ffmpeg_backend::FfmpegBackend, service::StreamerService};
use tokio::time::sleep;
use tracing::info;
use tracing_appender::rolling;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tokio::fs::create_dir_all("logs").await?;
    let file_appender = rolling::daily("logs", "webcamstreamer.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;

    if std::env::args().any(|arg| arg == "--panel") {
        return panel::terminal::run_panel(config).await;
    }

    let api_key = match config.api_key.clone() {
        Some(key) => key,
        None => {
            let key = format!(
                "{:016x}{:016x}",
                rand::random::<u64>(),
                rand::random::<u64>()
            );
            info!("no API_KEY configured, generated one for this run");
            println!("api key: {key}");
            key
        }
    };

    let streamer = StreamerService::new(FfmpegBackend::new());
    let notifier = TelegramNotifier::from_config(&config);
    let state = Arc::new(AppState::new(config.clone(), streamer, api_key, notifier));
    let app = web::routes::build_router(state.clone());
    state.notify(NotificationEvent::success(
        &config.app_name,
        format!("plugin host booted on {}", config.bind_addr),
    ));

    {
        let supervisor_state = state.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(15)).await;
                let report = {
                    let mut streamer = supervisor_state.streamer.lock().await;
                    streamer.supervise()
                };
                if let Some(report) = report {
                    supervisor_state.publish(report);
                }
            }
        });
    }

    info!(
        "{} plugin host listening on {} (plugin id: {})",
        config.app_name, config.bind_addr, config.plugin_id
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
