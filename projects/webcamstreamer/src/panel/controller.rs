use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{
    core::{
        message::{PluginMessage, StreamCommand},
        state::{Affordance, StreamState},
    },
    notify::{NotificationEvent, NotificationSink},
};

use super::{
    configuration::Configuration,
    dispatcher::CommandDispatcher,
    registry::{PanelContext, PanelViewModel, ViewModelDescriptor},
};

pub const TAB_ELEMENT_ID: &str = "#tab_plugin_webcamstreamer";
const ERROR_TITLE: &str = "Webcam Streamer Error";
const SUCCESS_TITLE: &str = "Webcam Streamer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Dispatched(StreamCommand),
    /// A command is already awaiting its push message.
    Ignored,
}

/// Reconciles the stream toggle with status reports from the plugin host.
///
/// `state` only ever changes through [`Self::on_server_message`]; the
/// `processing` guard is raised by [`Self::toggle_stream`] and cleared by any
/// message addressed to this plugin.
pub struct StreamToggleController<D, N> {
    plugin_id: String,
    dispatcher: D,
    notifications: N,
    configuration: Configuration,
    configured: bool,
    view_url: Option<String>,
    state: StreamState,
    processing: bool,
    pending_since: Option<Instant>,
    pending_timeout: Option<Duration>,
}

impl<D: CommandDispatcher, N: NotificationSink> StreamToggleController<D, N> {
    pub fn new(plugin_id: impl Into<String>, dispatcher: D, notifications: N) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            dispatcher,
            notifications,
            configuration: Configuration::default(),
            configured: false,
            view_url: None,
            state: StreamState::Idle,
            processing: false,
            pending_since: None,
            pending_timeout: None,
        }
    }

    /// Releases the guard after `timeout` without a push message. Off by default.
    pub fn with_pending_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pending_timeout = timeout;
        self
    }

    pub fn initialize(&mut self, configuration: Configuration) {
        self.apply_configuration(configuration);
        self.dispatcher.dispatch(StreamCommand::CheckStream);
        info!("stream panel initialized: configured={}", self.configured);
    }

    pub fn on_configuration_changed(&mut self, configuration: Configuration) {
        self.apply_configuration(configuration);
        debug!("stream panel configuration refreshed: configured={}", self.configured);
    }

    pub fn on_tab_activated(&mut self, active: bool) {
        self.view_url = if active {
            self.configuration.viewer_url()
        } else {
            None
        };
    }

    pub fn toggle_stream(&mut self) -> ToggleOutcome {
        if self.processing {
            debug!("toggle ignored while a command is pending");
            return ToggleOutcome::Ignored;
        }

        self.processing = true;
        self.pending_since = Some(Instant::now());

        let command = if self.state.is_streaming() {
            StreamCommand::StopStream
        } else {
            StreamCommand::StartStream
        };
        self.dispatcher.dispatch(command);
        ToggleOutcome::Dispatched(command)
    }

    /// Returns `false` when the message belongs to another plugin.
    pub fn on_server_message(&mut self, plugin: &str, message: &PluginMessage) -> bool {
        if plugin != self.plugin_id {
            return false;
        }

        if let Some(error) = &message.error {
            warn!("stream error reported: {error}");
            self.notifications
                .publish(NotificationEvent::error(ERROR_TITLE, error.clone()));
        }

        if let Some(success) = &message.success {
            self.notifications
                .publish(NotificationEvent::success(SUCCESS_TITLE, success.clone()));
        }

        if message.is_status_report() {
            self.state = StreamState::from_streaming(message.streaming == Some(true));
        }

        self.processing = false;
        self.pending_since = None;
        true
    }

    /// Returns `true` when the guard was released because the timeout elapsed.
    pub fn poll_pending_timeout(&mut self, now: Instant) -> bool {
        let (Some(timeout), Some(since)) = (self.pending_timeout, self.pending_since) else {
            return false;
        };
        if !self.processing || now.saturating_duration_since(since) < timeout {
            return false;
        }

        warn!("no stream status after {}s, releasing toggle", timeout.as_secs());
        self.processing = false;
        self.pending_since = None;
        self.notifications.publish(NotificationEvent::error(
            ERROR_TITLE,
            format!(
                "No response from the stream host after {} seconds",
                timeout.as_secs()
            ),
        ));
        true
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn view_url(&self) -> Option<&str> {
        self.view_url.as_deref()
    }

    pub fn stream_state(&self) -> StreamState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn affordance(&self) -> Affordance {
        Affordance::derive(self.state, self.processing)
    }

    pub fn icon_classes(&self) -> &'static str {
        self.affordance().icon_classes()
    }

    pub fn button_class(&self) -> &'static str {
        if self.state.is_streaming() {
            "btn-primary"
        } else {
            "btn-danger"
        }
    }

    fn apply_configuration(&mut self, configuration: Configuration) {
        self.configured = configuration.is_configured();
        self.view_url = configuration.viewer_url();
        self.configuration = configuration;
    }
}

impl<D: CommandDispatcher, N: NotificationSink> PanelViewModel for StreamToggleController<D, N> {
    fn on_after_binding(&mut self, configuration: &Configuration) {
        self.initialize(configuration.clone());
    }

    fn on_settings_updated(&mut self, configuration: &Configuration) {
        self.on_configuration_changed(configuration.clone());
    }

    fn on_tab_change(&mut self, next: &str) {
        self.on_tab_activated(next == TAB_ELEMENT_ID);
    }

    fn on_plugin_message(&mut self, plugin: &str, message: &PluginMessage) {
        self.on_server_message(plugin, message);
    }

    fn on_tick(&mut self, now: Instant) {
        self.poll_pending_timeout(now);
    }

    fn activate(&mut self) {
        self.toggle_stream();
    }

    fn render(&self) -> String {
        let configured = if self.is_configured() {
            "configured"
        } else {
            "not configured"
        };
        let state = match (self.stream_state(), self.is_processing()) {
            (_, true) => "working...",
            (StreamState::Streaming, false) => "streaming",
            (StreamState::Idle, false) => "idle",
        };
        let viewer = self.view_url().unwrap_or("-");
        format!(
            "[{}] {state} ({configured}) [{}] viewer: {viewer}",
            self.icon_classes(),
            self.button_class()
        )
    }
}

fn construct(context: &PanelContext) -> Box<dyn PanelViewModel> {
    Box::new(
        StreamToggleController::new(
            context.plugin_id.clone(),
            context.dispatcher.clone(),
            context.notifications.clone(),
        )
        .with_pending_timeout(context.pending_timeout),
    )
}

pub fn descriptor() -> ViewModelDescriptor {
    ViewModelDescriptor {
        name: "webcamstreamer",
        dependencies: &["dispatcher", "notifications"],
        elements: &[TAB_ELEMENT_ID],
        construct,
    }
}
