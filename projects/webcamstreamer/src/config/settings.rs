use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Plugin settings as stored by the plugin host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub channel_id: String,
    pub embed_url: String,
    pub stream_url: String,
    pub stream_id: String,
    pub webcam_url: String,
    pub auto_start: bool,
    pub flip_h: bool,
    pub flip_v: bool,
    pub rotate90: bool,
    pub stream_ratio: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            embed_url: String::new(),
            stream_url: "rtmp://a.rtmp.youtube.com/live2".to_owned(),
            stream_id: String::new(),
            webcam_url: String::new(),
            auto_start: false,
            flip_h: false,
            flip_v: false,
            rotate90: false,
            stream_ratio: "16:9".to_owned(),
        }
    }
}

/// Read-only view of the plugin settings with change notification.
pub trait ConfigurationProvider {
    fn snapshot(&self) -> PluginSettings;

    fn subscribe(&self) -> watch::Receiver<PluginSettings>;

    fn channel_id(&self) -> String {
        self.snapshot().channel_id
    }

    fn embed_url(&self) -> String {
        self.snapshot().embed_url
    }

    fn webcam_url(&self) -> String {
        self.snapshot().webcam_url
    }
}

pub struct SettingsStore {
    tx: watch::Sender<PluginSettings>,
}

impl SettingsStore {
    pub fn new(initial: PluginSettings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replaces the whole settings object and wakes every subscriber.
    pub fn replace(&self, settings: PluginSettings) {
        self.tx.send_replace(settings);
    }
}

impl ConfigurationProvider for SettingsStore {
    fn snapshot(&self) -> PluginSettings {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<PluginSettings> {
        self.tx.subscribe()
    }
}

/// Settings mirrored from a running plugin host.
pub struct RemoteSettings {
    client: Client,
    url: String,
    api_key: Option<String>,
    store: SettingsStore,
}

impl RemoteSettings {
    pub async fn connect(
        client: Client,
        server_url: &str,
        plugin_id: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let url = settings_url(server_url, plugin_id);
        let initial = fetch_settings(&client, &url, api_key.as_deref()).await?;
        Ok(Self {
            client,
            url,
            api_key,
            store: SettingsStore::new(initial),
        })
    }

    pub async fn refresh(&self) -> Result<()> {
        let settings = fetch_settings(&self.client, &self.url, self.api_key.as_deref()).await?;
        self.store.replace(settings);
        Ok(())
    }
}

impl ConfigurationProvider for RemoteSettings {
    fn snapshot(&self) -> PluginSettings {
        self.store.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<PluginSettings> {
        self.store.subscribe()
    }
}

pub fn settings_url(server_url: &str, plugin_id: &str) -> String {
    format!(
        "{}/api/plugin/{plugin_id}/settings",
        server_url.trim_end_matches('/')
    )
}

async fn fetch_settings(
    client: &Client,
    url: &str,
    api_key: Option<&str>,
) -> Result<PluginSettings> {
    let mut request = client.get(url);
    if let Some(key) = api_key {
        request = request.header(API_KEY_HEADER, key);
    }
    let response = request
        .send()
        .await
        .context("failed to request plugin settings")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("settings request failed status={status} body={body}");
    }

    response
        .json::<PluginSettings>()
        .await
        .context("failed to decode plugin settings")
}

#[cfg(test)]
mod tests {
    use super::{ConfigurationProvider, PluginSettings, SettingsStore, settings_url};

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: PluginSettings =
            serde_json::from_str(r#"{"webcam_url":"http://cam/stream"}"#).expect("should parse");
        assert_eq!(settings.webcam_url, "http://cam/stream");
        assert_eq!(settings.stream_url, "rtmp://a.rtmp.youtube.com/live2");
        assert_eq!(settings.stream_ratio, "16:9");
    }

    #[tokio::test]
    async fn replace_notifies_subscribers() {
        let store = SettingsStore::new(PluginSettings::default());
        let mut rx = store.subscribe();

        store.replace(PluginSettings {
            embed_url: "https://example.com/embed".to_owned(),
            ..PluginSettings::default()
        });

        rx.changed().await.expect("store should still be alive");
        assert_eq!(rx.borrow().embed_url, "https://example.com/embed");
        assert_eq!(store.embed_url(), "https://example.com/embed");
    }

    #[test]
    fn settings_url_strips_trailing_slash() {
        assert_eq!(
            settings_url("http://octopi.local/", "webcamstreamer"),
            "http://octopi.local/api/plugin/webcamstreamer/settings"
        );
    }
}
