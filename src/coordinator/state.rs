use crate::barcode::{CameraFacing, TorchState};
use crate::error::ScannerError;
use crate::geometry::{Rect, Size};
use std::fmt;

/// Capture pipeline lifecycle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed(ScannerError),
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed(_) => "failed",
        }
    }

    /// States from which a start request opens a new session
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            LifecycleState::Uninitialized | LifecycleState::Stopped | LifecycleState::Failed(_)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Failed(error) => write!(f, "failed ({})", error),
            other => f.write_str(other.name()),
        }
    }
}

/// Snapshot published to the presentation layer on every change
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerState {
    pub lifecycle: LifecycleState,
    /// Set once a session opened; cleared when permission is denied
    pub has_camera_permission: bool,
    pub facing: CameraFacing,
    pub torch: TorchState,
    pub zoom_scale: f64,
    /// Native texture size, known once running
    pub texture_size: Option<Size>,
    pub number_of_cameras: Option<u32>,
    /// Most recent failure; kept while a retry is in flight
    pub error: Option<ScannerError>,
    /// Percentage scan window last pushed downstream
    pub scan_window: Option<Rect>,
}

impl ScannerState {
    pub fn uninitialized(facing: CameraFacing) -> Self {
        Self {
            lifecycle: LifecycleState::Uninitialized,
            has_camera_permission: false,
            facing,
            torch: TorchState::Unavailable,
            zoom_scale: 0.0,
            texture_size: None,
            number_of_cameras: None,
            error: None,
            scan_window: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == LifecycleState::Running
    }
}
