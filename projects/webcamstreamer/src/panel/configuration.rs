use crate::config::settings::ConfigurationProvider;

const YOUTUBE_LIVE_EMBED: &str = "https://www.youtube.com/embed/live_stream?channel=";

/// Settings fields the panel reads, captured at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub channel_id: String,
    pub embed_url: String,
    pub webcam_url: String,
    pub stream_ratio: String,
}

impl Configuration {
    pub fn from_provider(provider: &impl ConfigurationProvider) -> Self {
        Self {
            channel_id: provider.channel_id(),
            embed_url: provider.embed_url(),
            webcam_url: provider.webcam_url(),
            stream_ratio: provider.snapshot().stream_ratio,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.embed_url.trim().is_empty() && !self.webcam_url.trim().is_empty()
    }

    /// Embedded viewer address: the configured embed url, else the channel's
    /// live embed.
    pub fn viewer_url(&self) -> Option<String> {
        let embed_url = self.embed_url.trim();
        if !embed_url.is_empty() {
            return Some(embed_url.to_owned());
        }
        let channel_id = self.channel_id.trim();
        if !channel_id.is_empty() {
            return Some(format!("{YOUTUBE_LIVE_EMBED}{channel_id}"));
        }
        None
    }

    pub fn viewer_padding(&self) -> &'static str {
        if self.stream_ratio == "4:3" {
            "75%"
        } else {
            "56.25%"
        }
    }
}
