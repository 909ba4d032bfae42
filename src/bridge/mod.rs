//! Boundary to the native capture/detection bridge.
//!
//! The core never talks to camera hardware itself; everything goes through
//! [`ScannerBridge`], which behaves like a remote call that may fail.

mod simulated;

pub use simulated::SimulatedBridge;

use crate::barcode::{BarcodeFormat, CameraFacing, Detection, DetectionSpeed, TorchState};
use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::geometry::{Rect, Size};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// Options sent with a start request
#[derive(Debug, Clone, PartialEq)]
pub struct StartOptions {
    pub facing: CameraFacing,
    /// Empty means every supported format
    pub formats: Vec<BarcodeFormat>,
    pub detection_speed: DetectionSpeed,
    pub detection_timeout: Duration,
    pub return_image: bool,
    pub torch_enabled: bool,
    pub camera_resolution: Option<Size>,
}

impl StartOptions {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            facing: config.facing,
            formats: config.formats.clone(),
            detection_speed: config.detection_speed,
            detection_timeout: Duration::from_millis(config.detection_timeout_ms),
            return_image: config.return_image,
            torch_enabled: config.torch_enabled,
            camera_resolution: config.camera_resolution.map(Size::from),
        }
    }
}

/// What the native side reports once the camera session is open
#[derive(Debug, Clone, PartialEq)]
pub struct StartArgs {
    /// Native texture size in pixels
    pub texture_size: Size,
    pub torch: TorchState,
    pub zoom_scale: f64,
    pub number_of_cameras: Option<u32>,
}

/// Inbound events from the native detector
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Detection(Detection),
    Error {
        code: String,
        message: Option<String>,
        details: Option<serde_json::Value>,
    },
    TorchStateChanged(TorchState),
    ZoomScaleChanged(f64),
}

/// Raw failure as thrown across the bridge, before classification
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeFailure {
    /// Already a typed scanner error
    Scanner(ScannerError),
    /// Generic platform-channel failure
    Platform {
        code: String,
        message: Option<String>,
        details: Option<serde_json::Value>,
    },
    /// Anything else the bridge threw
    Other(String),
}

impl BridgeFailure {
    pub fn platform<S: Into<String>>(code: S, message: Option<&str>) -> Self {
        Self::Platform {
            code: code.into(),
            message: message.map(str::to_string),
            details: None,
        }
    }
}

/// Turn a raw bridge failure into a scanner error.
///
/// Typed errors pass through unchanged, platform failures keep their
/// code/message/details verbatim and anything else only keeps its details.
pub fn classify_failure(failure: BridgeFailure) -> ScannerError {
    match failure {
        BridgeFailure::Scanner(error) => error,
        BridgeFailure::Platform {
            code,
            message,
            details,
        } => ScannerError::Bridge {
            code,
            message,
            details,
        },
        BridgeFailure::Other(details) => ScannerError::Unknown {
            details: Some(details),
        },
    }
}

/// Native capture/detection bridge
#[async_trait]
pub trait ScannerBridge: Send + Sync {
    /// Open the camera session; resolves once the native side confirms it
    async fn start(&self, options: StartOptions) -> Result<StartArgs, BridgeFailure>;

    /// Close the camera session
    async fn stop(&self) -> Result<(), BridgeFailure>;

    /// Restrict detection to a percentage rectangle, or `None` for the full frame
    async fn update_scan_window(&self, window: Option<Rect>) -> Result<(), BridgeFailure>;

    async fn set_torch(&self, state: TorchState) -> Result<(), BridgeFailure>;

    async fn set_zoom_scale(&self, scale: f64) -> Result<(), BridgeFailure>;

    async fn reset_zoom_scale(&self) -> Result<(), BridgeFailure>;

    /// Attach a listener to the native event stream
    fn event_stream(&self) -> BoxStream<'static, BridgeEvent>;
}
