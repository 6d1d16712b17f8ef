use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::process::Child;

use crate::config::settings::PluginSettings;

/// Where and how the webcam feed gets pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub webcam_url: String,
    pub publish_url: String,
    pub video_filters: String,
}

impl StreamTarget {
    pub fn from_settings(settings: &PluginSettings) -> Result<Self> {
        let webcam_url = settings.webcam_url.trim();
        if webcam_url.is_empty() {
            bail!("webcam url is not configured");
        }
        let stream_id = settings.stream_id.trim();
        if stream_id.is_empty() {
            bail!("stream key is not configured");
        }

        Ok(Self {
            webcam_url: webcam_url.to_owned(),
            publish_url: format!(
                "{}/{stream_id}",
                settings.stream_url.trim().trim_end_matches('/')
            ),
            video_filters: video_filters(settings),
        })
    }
}

/// ffmpeg filter chain for the host's webcam orientation settings.
pub fn video_filters(settings: &PluginSettings) -> String {
    let mut filters = Vec::new();
    if settings.flip_h {
        filters.push("hflip");
    }
    if settings.flip_v {
        filters.push("vflip");
    }
    if settings.rotate90 {
        filters.push("transpose=cclock");
    }
    if filters.is_empty() {
        filters.push("null");
    }
    filters.join(",")
}

#[async_trait]
pub trait StreamBackend: Send + Sync {
    async fn spawn_stream(&self, target: &StreamTarget) -> Result<Child>;
}

#[cfg(test)]
mod tests {
    use super::{StreamTarget, video_filters};
    use crate::config::settings::PluginSettings;

    #[test]
    fn no_orientation_settings_use_null_filter() {
        assert_eq!(video_filters(&PluginSettings::default()), "null");
    }

    #[test]
    fn orientation_filters_keep_fixed_order() {
        let settings = PluginSettings {
            flip_h: true,
            flip_v: true,
            rotate90: true,
            ..PluginSettings::default()
        };
        assert_eq!(video_filters(&settings), "hflip,vflip,transpose=cclock");
    }

    #[test]
    fn target_requires_webcam_url_and_stream_key() {
        let mut settings = PluginSettings::default();
        let err = StreamTarget::from_settings(&settings).expect_err("webcam url missing");
        assert!(err.to_string().contains("webcam url"));

        settings.webcam_url = "http://127.0.0.1:8080/?action=stream".to_owned();
        let err = StreamTarget::from_settings(&settings).expect_err("stream key missing");
        assert!(err.to_string().contains("stream key"));

        settings.stream_id = "abcd-1234".to_owned();
        let target = StreamTarget::from_settings(&settings).expect("target should build");
        assert_eq!(
            target.publish_url,
            "rtmp://a.rtmp.youtube.com/live2/abcd-1234"
        );
    }
}
