pub mod client;
pub mod sse;

use tokio::sync::broadcast;
use tracing::debug;

use crate::core::message::{PluginMessage, PushEvent};

/// Fan-out of push events to every connected panel.
#[derive(Clone)]
pub struct PushHub {
    tx: broadcast::Sender<PushEvent>,
}

impl PushHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.tx.subscribe()
    }

    pub fn send_plugin_message(&self, plugin: &str, data: PluginMessage) {
        self.send(PushEvent::PluginMessage {
            plugin: plugin.to_owned(),
            data,
        });
    }

    pub fn send_settings_updated(&self) {
        self.send(PushEvent::SettingsUpdated);
    }

    fn send(&self, event: PushEvent) {
        if self.tx.send(event).is_err() {
            debug!("push event dropped: no panel connected");
        }
    }
}
