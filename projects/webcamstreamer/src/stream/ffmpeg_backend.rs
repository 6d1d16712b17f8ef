use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::traits::{StreamBackend, StreamTarget};

/// Pushes an MJPEG webcam feed to an RTMP ingest with a silent audio track.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    program: String,
    framerate: u32,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self {
            program: "ffmpeg".to_owned(),
            framerate: 5,
        }
    }

    fn stream_args(&self, target: &StreamTarget) -> Vec<String> {
        let framerate = self.framerate.to_string();
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-re",
            "-f",
            "mjpeg",
            "-framerate",
            framerate.as_str(),
            "-i",
            target.webcam_url.as_str(),
            "-ar",
            "44100",
            "-ac",
            "2",
            "-acodec",
            "pcm_s16le",
            "-f",
            "s16le",
            "-i",
            "/dev/zero",
            "-acodec",
            "aac",
            "-ab",
            "128k",
            "-vcodec",
            "h264",
            "-pix_fmt",
            "yuv420p",
            "-g",
            "10",
            "-vb",
            "700k",
            "-vf",
            target.video_filters.as_str(),
            "-framerate",
            framerate.as_str(),
            "-threads",
            "4",
            "-f",
            "flv",
            target.publish_url.as_str(),
        ]
        .into_iter()
        .map(str::to_owned)
        .collect()
    }
}

#[async_trait]
impl StreamBackend for FfmpegBackend {
    async fn spawn_stream(&self, target: &StreamTarget) -> Result<Child> {
        let child = Command::new(&self.program)
            .args(self.stream_args(target))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn ffmpeg stream process")?;

        Ok(child)
    }
}
