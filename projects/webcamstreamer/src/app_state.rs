use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    config::{AppConfig, settings::SettingsStore},
    core::message::PluginMessage,
    notify::{NotificationEvent, telegram::TelegramNotifier},
    push::PushHub,
    stream::{ffmpeg_backend::FfmpegBackend, service::StreamerService},
};

pub struct AppState {
    pub config: AppConfig,
    pub streamer: Mutex<StreamerService<FfmpegBackend>>,
    pub settings: SettingsStore,
    pub push: PushHub,
    pub api_key: String,
    pub notifier: Option<Arc<TelegramNotifier>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        streamer: StreamerService<FfmpegBackend>,
        api_key: String,
        notifier: Option<TelegramNotifier>,
    ) -> Self {
        let settings = SettingsStore::new(config.plugin_settings.clone());
        Self {
            config,
            streamer: Mutex::new(streamer),
            settings,
            push: PushHub::new(64),
            api_key,
            notifier: notifier.map(Arc::new),
        }
    }

    /// Sends a stream outcome to every panel and mirrors it to Telegram.
    pub fn publish(&self, message: PluginMessage) {
        if let Some(error) = &message.error {
            self.notify(NotificationEvent::error(&self.config.app_name, error.clone()));
        }
        if let Some(success) = &message.success {
            self.notify(NotificationEvent::success(
                &self.config.app_name,
                success.clone(),
            ));
        }
        self.push.send_plugin_message(&self.config.plugin_id, message);
    }

    #[cfg(test)]
    pub fn for_tests(api_key: &str) -> Arc<Self> {
        let config = AppConfig {
            app_name: "WebcamStreamer".to_owned(),
            bind_addr: ([127, 0, 0, 1], 5000).into(),
            api_key: Some(api_key.to_owned()),
            plugin_id: "webcamstreamer".to_owned(),
            panel_server_url: "http://127.0.0.1:5000".to_owned(),
            pending_timeout: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            plugin_settings: Default::default(),
        };
        Arc::new(Self::new(
            config,
            StreamerService::new(FfmpegBackend::new()),
            api_key.to_owned(),
            None,
        ))
    }

    pub fn notify(&self, event: NotificationEvent) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(err) = notifier.send_event(&event).await {
                warn!("telegram notify failed: {err}");
            }
        });
    }
}
