mod builder;
mod detection;
mod lifecycle;
mod state;

pub use builder::DetectionCoordinatorBuilder;
pub use detection::DetectionCoordinator;
pub use lifecycle::{ControllerOwnership, HostLifecycleEvent};
pub use state::{LifecycleState, ScannerState};
