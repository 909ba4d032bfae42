pub mod barcode;
pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod geometry;
pub mod scan_window;
pub mod view;

pub use barcode::{Barcode, BarcodeFormat, CameraFacing, Detection, DetectionSpeed, TorchState};
pub use bridge::{
    classify_failure, BridgeEvent, BridgeFailure, ScannerBridge, SimulatedBridge, StartArgs,
    StartOptions,
};
pub use config::ScanviewConfig;
pub use coordinator::{
    ControllerOwnership, DetectionCoordinator, DetectionCoordinatorBuilder, HostLifecycleEvent,
    LifecycleState, ScannerState,
};
pub use error::{Result, ScannerError, ScannerErrorCode, ScanviewError};
pub use events::{EventBus, ScannerEvent};
pub use geometry::{compute_texture_relative_window, FitMode, Rect, Size};
pub use scan_window::{ScanWindowDispatcher, ScanWindowHysteresis, ScanWindowPipeline};
pub use view::ScannerView;
