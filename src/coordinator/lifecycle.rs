use serde::{Deserialize, Serialize};

/// Host application lifecycle signals, as reported by the embedding layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostLifecycleEvent {
    Resumed,
    Inactive,
    Paused,
    Detached,
    Hidden,
}

impl HostLifecycleEvent {
    /// The app left the foreground; the camera should be released
    pub fn is_backgrounded(self) -> bool {
        matches!(
            self,
            HostLifecycleEvent::Inactive | HostLifecycleEvent::Paused | HostLifecycleEvent::Hidden
        )
    }

    pub fn is_foregrounded(self) -> bool {
        self == HostLifecycleEvent::Resumed
    }
}

/// Who created the controller driving the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerOwnership {
    /// Created by the view itself; restarted on resume and released on dispose
    #[default]
    Owned,
    /// Supplied by application code; never restarted automatically
    External,
}
