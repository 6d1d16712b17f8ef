use tokio::process::Child;
use tracing::{error, info, warn};

use crate::config::settings::PluginSettings;
use crate::core::{
    message::{PluginMessage, StreamCommand},
    state::StreamState,
};

use super::traits::{StreamBackend, StreamTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterEvent {
    PrintStarted,
    PrintDone,
    PrintCancelled,
}

impl PrinterEvent {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PrintStarted" => Some(Self::PrintStarted),
            "PrintDone" => Some(Self::PrintDone),
            "PrintCancelled" => Some(Self::PrintCancelled),
            _ => None,
        }
    }
}

/// Owns the single stream process and reports every outcome as a push message.
pub struct StreamerService<B: StreamBackend> {
    backend: B,
    child: Option<Child>,
}

impl<B: StreamBackend> StreamerService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            child: None,
        }
    }

    pub async fn handle_command(
        &mut self,
        command: StreamCommand,
        settings: &PluginSettings,
    ) -> PluginMessage {
        match command {
            StreamCommand::StartStream => {
                info!("start stream command received");
                self.start(settings).await
            }
            StreamCommand::StopStream => {
                info!("stop stream command received");
                self.stop().await
            }
            StreamCommand::CheckStream => {
                info!("checking stream status");
                self.check()
            }
        }
    }

    /// Auto start/stop around prints. `None` when the event needs no action.
    pub async fn handle_printer_event(
        &mut self,
        event: PrinterEvent,
        settings: &PluginSettings,
    ) -> Option<PluginMessage> {
        if !settings.auto_start {
            return None;
        }

        match event {
            PrinterEvent::PrintStarted => Some(self.start(settings).await),
            PrinterEvent::PrintDone | PrinterEvent::PrintCancelled => Some(self.stop().await),
        }
    }

    pub async fn start(&mut self, settings: &PluginSettings) -> PluginMessage {
        self.reap();
        if self.child.is_some() {
            return PluginMessage::status(true);
        }

        let target = match StreamTarget::from_settings(settings) {
            Ok(target) => target,
            Err(err) => {
                warn!("refusing to start stream: {err}");
                return PluginMessage::failure(err.to_string(), false);
            }
        };

        match self.backend.spawn_stream(&target).await {
            Ok(child) => {
                info!(
                    "stream started: filters={} pid={:?}",
                    target.video_filters,
                    child.id()
                );
                self.child = Some(child);
                PluginMessage::success("Stream started", true)
            }
            Err(err) => {
                error!("failed to start stream: {err:#}");
                PluginMessage::failure(format!("{err:#}"), false)
            }
        }
    }

    pub async fn stop(&mut self) -> PluginMessage {
        let Some(mut child) = self.child.take() else {
            return PluginMessage::status(false);
        };

        if let Err(err) = child.kill().await {
            error!("failed to stop stream process: {err}");
            // Still ours until reaped.
            self.child = Some(child);
            return PluginMessage::failure(format!("failed to stop stream: {err}"), true);
        }
        info!("stream stopped");
        PluginMessage::success("Stream stopped", false)
    }

    pub fn check(&mut self) -> PluginMessage {
        self.reap();
        PluginMessage::status(self.child.is_some())
    }

    /// Reports a stream process that ended on its own.
    pub fn supervise(&mut self) -> Option<PluginMessage> {
        let status = self.reap()?;
        warn!("stream process exited unexpectedly: {status}");
        Some(PluginMessage::failure(
            format!("stream process exited: {status}"),
            false,
        ))
    }

    pub fn state(&self) -> StreamState {
        StreamState::from_streaming(self.child.is_some())
    }

    fn reap(&mut self) -> Option<std::process::ExitStatus> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                Some(status)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("failed to poll stream process: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{process::Stdio, time::Duration};

    use anyhow::bail;
    use async_trait::async_trait;
    use tokio::{
        process::{Child, Command},
        time::sleep,
    };

    use crate::{
        config::settings::PluginSettings,
        core::{
            message::{PluginMessage, StreamCommand},
            state::StreamState,
        },
        stream::traits::{StreamBackend, StreamTarget},
    };

    use super::{PrinterEvent, StreamerService};

    struct MockBackend {
        script: &'static str,
    }

    #[async_trait]
    impl StreamBackend for MockBackend {
        async fn spawn_stream(&self, _target: &StreamTarget) -> anyhow::Result<Child> {
            let child = Command::new("sh")
                .arg("-c")
                .arg(self.script)
                .stdout(Stdio::null())
                .kill_on_drop(true)
                .spawn()?;
            Ok(child)
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl StreamBackend for FailingBackend {
        async fn spawn_stream(&self, _target: &StreamTarget) -> anyhow::Result<Child> {
            bail!("ffmpeg not installed")
        }
    }

    fn configured() -> PluginSettings {
        PluginSettings {
            webcam_url: "http://127.0.0.1:8080/?action=stream".to_owned(),
            stream_id: "key".to_owned(),
            ..PluginSettings::default()
        }
    }

    fn long_running() -> MockBackend {
        MockBackend { script: "sleep 30" }
    }

    #[tokio::test]
    async fn start_and_stop_report_success() {
        let mut service = StreamerService::new(long_running());

        let started = service
            .handle_command(StreamCommand::StartStream, &configured())
            .await;
        assert_eq!(started, PluginMessage::success("Stream started", true));
        assert_eq!(service.state(), StreamState::Streaming);

        let stopped = service
            .handle_command(StreamCommand::StopStream, &configured())
            .await;
        assert_eq!(stopped, PluginMessage::success("Stream stopped", false));
        assert_eq!(service.state(), StreamState::Idle);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_reports_status() {
        let mut service = StreamerService::new(long_running());
        service.start(&configured()).await;

        let again = service.start(&configured()).await;
        assert_eq!(again, PluginMessage::status(true));

        service.stop().await;
    }

    #[tokio::test]
    async fn stop_without_stream_reports_idle_status() {
        let mut service = StreamerService::new(long_running());
        assert_eq!(service.stop().await, PluginMessage::status(false));
    }

    #[tokio::test]
    async fn failed_kill_keeps_process_tracked() {
        let mut service = StreamerService::new(MockBackend { script: "exit 0" });
        service.start(&configured()).await;

        // A child that has already been waited on refuses to be killed.
        let mut child = service.child.take().expect("child should be tracked");
        child.wait().await.expect("child should exit");
        service.child = Some(child);

        let message = service.stop().await;
        assert_eq!(message.streaming, Some(true));
        assert!(
            message
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("failed to stop stream"))
        );
        assert_eq!(service.state(), StreamState::Streaming);

        assert_eq!(service.check(), PluginMessage::status(false));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_as_error() {
        let mut service = StreamerService::new(FailingBackend);
        let message = service.start(&configured()).await;

        assert!(message.is_status_report());
        assert_eq!(message.streaming, Some(false));
        assert!(
            message
                .error
                .as_deref()
                .is_some_and(|e| e.contains("not installed"))
        );
    }

    #[tokio::test]
    async fn unconfigured_settings_are_refused() {
        let mut service = StreamerService::new(long_running());
        let message = service.start(&PluginSettings::default()).await;

        assert!(message.error.is_some());
        assert_eq!(service.state(), StreamState::Idle);
    }

    #[tokio::test]
    async fn supervise_detects_exited_process() {
        let mut service = StreamerService::new(MockBackend { script: "exit 3" });
        service.start(&configured()).await;

        let mut report = None;
        for _ in 0..40 {
            report = service.supervise();
            if report.is_some() {
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }

        let report = report.expect("exit should be detected");
        assert_eq!(report.streaming, Some(false));
        assert!(report.error.is_some());
        assert_eq!(service.check(), PluginMessage::status(false));
    }

    #[tokio::test]
    async fn printer_events_only_act_with_auto_start() {
        let mut service = StreamerService::new(long_running());

        let ignored = service
            .handle_printer_event(PrinterEvent::PrintStarted, &configured())
            .await;
        assert!(ignored.is_none());

        let auto = PluginSettings {
            auto_start: true,
            ..configured()
        };
        let started = service
            .handle_printer_event(PrinterEvent::PrintStarted, &auto)
            .await;
        assert_eq!(started.and_then(|m| m.streaming), Some(true));

        let stopped = service
            .handle_printer_event(PrinterEvent::PrintDone, &auto)
            .await;
        assert_eq!(stopped.and_then(|m| m.streaming), Some(false));
    }

    #[test]
    fn unknown_printer_events_are_not_parsed() {
        assert_eq!(
            PrinterEvent::parse("PrintCancelled"),
            Some(PrinterEvent::PrintCancelled)
        );
        assert_eq!(PrinterEvent::parse("Connected"), None);
    }
}
