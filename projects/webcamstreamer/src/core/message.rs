use serde::{Deserialize, Serialize};

/// Command body accepted by the plugin endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum StreamCommand {
    CheckStream,
    StartStream,
    StopStream,
}

/// Payload pushed from the plugin host to every panel.
///
/// `streaming` is only meaningful when `status` is `Some(true)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
}

impl PluginMessage {
    pub fn status(streaming: bool) -> Self {
        Self {
            status: Some(true),
            streaming: Some(streaming),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>, streaming: bool) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::status(streaming)
        }
    }

    pub fn success(message: impl Into<String>, streaming: bool) -> Self {
        Self {
            success: Some(message.into()),
            ..Self::status(streaming)
        }
    }

    pub fn is_status_report(&self) -> bool {
        self.status == Some(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    PluginMessage { plugin: String, data: PluginMessage },
    SettingsUpdated,
}
