use serde::Serialize;

/// Last stream state reported by the plugin host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
}

impl StreamState {
    pub fn from_streaming(streaming: bool) -> Self {
        if streaming {
            Self::Streaming
        } else {
            Self::Idle
        }
    }

    pub fn is_streaming(self) -> bool {
        self == Self::Streaming
    }
}

/// What the toggle control currently offers the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    Start,
    Stop,
    Busy,
}

impl Affordance {
    pub fn derive(state: StreamState, processing: bool) -> Self {
        match (state, processing) {
            (_, true) => Self::Busy,
            (StreamState::Streaming, false) => Self::Stop,
            (StreamState::Idle, false) => Self::Start,
        }
    }

    pub fn icon_classes(self) -> &'static str {
        match self {
            Self::Start => "icon-play",
            Self::Stop => "icon-stop",
            Self::Busy => "icon-spin icon-spinner",
        }
    }
}
