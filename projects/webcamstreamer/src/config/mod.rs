pub mod settings;

use std::{env, net::SocketAddr, time::Duration};

use settings::PluginSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    pub api_key: Option<String>,
    pub plugin_id: String,
    pub panel_server_url: String,
    pub pending_timeout: Option<Duration>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub plugin_settings: PluginSettings,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "WebcamStreamer".to_owned());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_owned())
            .parse()?;
        let api_key = non_empty("API_KEY");
        let plugin_id = non_empty("PLUGIN_ID").unwrap_or_else(|| "webcamstreamer".to_owned());
        let panel_server_url = non_empty("PANEL_SERVER_URL")
            .unwrap_or_else(|| "http://127.0.0.1:5000".to_owned())
            .trim_end_matches('/')
            .to_owned();
        let pending_timeout = env::var("PENDING_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs);
        let telegram_bot_token = non_empty("TELEGRAM_BOT_TOKEN");
        let telegram_chat_id = non_empty("TELEGRAM_CHAT_ID");

        let defaults = PluginSettings::default();
        let plugin_settings = PluginSettings {
            channel_id: env::var("CHANNEL_ID").unwrap_or(defaults.channel_id),
            embed_url: env::var("EMBED_URL").unwrap_or(defaults.embed_url),
            stream_url: non_empty("STREAM_URL").unwrap_or(defaults.stream_url),
            stream_id: env::var("STREAM_ID").unwrap_or(defaults.stream_id),
            webcam_url: env::var("WEBCAM_URL").unwrap_or(defaults.webcam_url),
            auto_start: flag("AUTO_START", defaults.auto_start),
            flip_h: flag("WEBCAM_FLIP_H", defaults.flip_h),
            flip_v: flag("WEBCAM_FLIP_V", defaults.flip_v),
            rotate90: flag("WEBCAM_ROTATE90", defaults.rotate90),
            stream_ratio: non_empty("STREAM_RATIO").unwrap_or(defaults.stream_ratio),
        };

        Ok(Self {
            app_name,
            bind_addr,
            api_key,
            plugin_id,
            panel_server_url,
            pending_timeout,
            telegram_bot_token,
            telegram_chat_id,
            plugin_settings,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
