use super::lifecycle::{ControllerOwnership, HostLifecycleEvent};
use super::state::{LifecycleState, ScannerState};
use crate::barcode::{Detection, DetectionSpeed, TorchState};
use crate::bridge::{classify_failure, BridgeEvent, ScannerBridge, StartOptions};
use crate::error::{ScannerError, ScannerErrorCode};
use crate::events::{EventBus, ScannerEvent};
use crate::geometry::{Rect, Size};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// State shared between the coordinator and its event listener task
struct Shared {
    state: watch::Sender<ScannerState>,
    disposed: Mutex<bool>,
    last_detection: Mutex<Option<BTreeSet<String>>>,
}

impl Shared {
    /// Apply `change` and notify watchers if it reports a modification.
    ///
    /// Returns false without touching the state once disposed.
    fn modify(&self, change: impl FnOnce(&mut ScannerState) -> bool) -> bool {
        let disposed = self.disposed.lock();
        if *disposed {
            return false;
        }
        self.state.send_if_modified(change)
    }

    /// Publish `event` unless disposed.
    ///
    /// Holds the disposed lock while publishing so nothing goes out once
    /// `dispose()` has marked the coordinator.
    fn publish(&self, events: &EventBus, event: ScannerEvent) -> bool {
        let disposed = self.disposed.lock();
        if *disposed {
            return false;
        }
        events.publish_lossy(event);
        true
    }

    fn snapshot(&self) -> ScannerState {
        self.state.borrow().clone()
    }

    fn is_disposed(&self) -> bool {
        *self.disposed.lock()
    }
}

/// Owns the capture lifecycle and the single listener on the native
/// detection stream.
///
/// Every state change is published through a [`watch`] channel exactly once;
/// detections and stream errors go out on the [`EventBus`].
pub struct DetectionCoordinator {
    session_id: Uuid,
    bridge: Arc<dyn ScannerBridge>,
    options: Mutex<StartOptions>,
    ownership: ControllerOwnership,
    start_delay: Option<Duration>,
    shared: Arc<Shared>,
    events: EventBus,
    listener: Mutex<Option<JoinHandle<()>>>,
    listener_established: AtomicBool,
    first_start_pending: AtomicBool,
    cancel: CancellationToken,
}

impl DetectionCoordinator {
    pub(super) fn new(
        bridge: Arc<dyn ScannerBridge>,
        options: StartOptions,
        ownership: ControllerOwnership,
        start_delay: Option<Duration>,
        events: EventBus,
    ) -> Self {
        let session_id = Uuid::new_v4();
        let (state, _) = watch::channel(ScannerState::uninitialized(options.facing));

        info!(
            "Created detection coordinator {} ({:?} controller, facing {:?})",
            session_id, ownership, options.facing
        );

        Self {
            session_id,
            bridge,
            options: Mutex::new(options),
            ownership,
            start_delay: start_delay.filter(|delay| !delay.is_zero()),
            shared: Arc::new(Shared {
                state,
                disposed: Mutex::new(false),
                last_detection: Mutex::new(None),
            }),
            events,
            listener: Mutex::new(None),
            listener_established: AtomicBool::new(false),
            first_start_pending: AtomicBool::new(true),
            cancel: CancellationToken::new(),
        }
    }

    /// Open the camera session and begin delivering detections.
    ///
    /// A no-op while starting or running. Failures move the state to
    /// `Failed` and are also returned here.
    pub async fn start(&self) -> Result<(), ScannerError> {
        if self.shared.is_disposed() {
            debug!("[{}] start ignored: coordinator disposed", self.session_id);
            return Ok(());
        }

        let began = self.shared.modify(|state| {
            if state.lifecycle.can_start() {
                state.lifecycle = LifecycleState::Starting;
                true
            } else {
                false
            }
        });
        if !began {
            debug!(
                "[{}] start ignored in state {}",
                self.session_id,
                self.shared.snapshot().lifecycle
            );
            return Ok(());
        }

        info!("[{}] Starting scanner", self.session_id);
        self.ensure_listener();

        if self.first_start_pending.swap(false, Ordering::SeqCst) {
            if let Some(delay) = self.start_delay {
                debug!("[{}] Delaying first start by {:?}", self.session_id, delay);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => {
                        return Err(ScannerError::controller(ScannerErrorCode::ControllerDisposed));
                    }
                }
            }
        }

        let options = self.options.lock().clone();
        match self.bridge.start(options).await {
            Ok(args) => {
                let applied = self.shared.modify(|state| {
                    state.lifecycle = LifecycleState::Running;
                    state.has_camera_permission = true;
                    state.texture_size = Some(args.texture_size);
                    state.torch = args.torch;
                    state.zoom_scale = args.zoom_scale;
                    state.number_of_cameras = args.number_of_cameras;
                    state.error = None;
                    true
                });

                if !applied {
                    warn!(
                        "[{}] Camera opened after dispose; releasing it",
                        self.session_id
                    );
                    if self.ownership == ControllerOwnership::Owned {
                        if let Err(failure) = self.bridge.stop().await {
                            warn!(
                                "[{}] Failed to release camera: {}",
                                self.session_id,
                                classify_failure(failure)
                            );
                        }
                    }
                    return Err(ScannerError::controller(
                        ScannerErrorCode::ControllerDisposed,
                    ));
                }

                info!(
                    "[{}] Scanner running with texture {}",
                    self.session_id, args.texture_size
                );
                Ok(())
            }
            Err(failure) => {
                let error = classify_failure(failure);
                error!("[{}] Failed to start scanner: {}", self.session_id, error);

                let permission_denied = error.error_code() == ScannerErrorCode::PermissionDenied;
                self.shared.modify(|state| {
                    state.lifecycle = LifecycleState::Failed(error.clone());
                    state.error = Some(error.clone());
                    if permission_denied {
                        state.has_camera_permission = false;
                    }
                    true
                });

                Err(error)
            }
        }
    }

    /// Close the camera session. A no-op unless running.
    pub async fn stop(&self) -> Result<(), ScannerError> {
        if self.shared.is_disposed() {
            return Ok(());
        }

        let began = self.shared.modify(|state| {
            if state.lifecycle == LifecycleState::Running {
                state.lifecycle = LifecycleState::Stopping;
                true
            } else {
                false
            }
        });
        if !began {
            debug!(
                "[{}] stop ignored in state {}",
                self.session_id,
                self.shared.snapshot().lifecycle
            );
            return Ok(());
        }

        info!("[{}] Stopping scanner", self.session_id);

        match self.bridge.stop().await {
            Ok(()) => {
                self.shared.modify(|state| {
                    state.lifecycle = LifecycleState::Stopped;
                    state.torch = TorchState::Unavailable;
                    true
                });
                info!("[{}] Scanner stopped", self.session_id);
                Ok(())
            }
            Err(failure) => {
                let error = classify_failure(failure);
                warn!("[{}] Error while stopping scanner: {}", self.session_id, error);

                self.shared.modify(|state| {
                    state.lifecycle = LifecycleState::Stopped;
                    state.torch = TorchState::Unavailable;
                    state.error = Some(error.clone());
                    true
                });
                Err(error)
            }
        }
    }

    /// React to the host app moving between foreground and background.
    ///
    /// Nothing happens until camera permission has been granted once.
    pub async fn on_host_lifecycle_change(
        &self,
        event: HostLifecycleEvent,
    ) -> Result<(), ScannerError> {
        if self.shared.is_disposed() {
            return Ok(());
        }

        let state = self.shared.snapshot();
        if !state.has_camera_permission {
            debug!(
                "[{}] Ignoring {:?}: camera permission not granted",
                self.session_id, event
            );
            return Ok(());
        }

        if event.is_backgrounded() {
            if state.lifecycle == LifecycleState::Running {
                debug!("[{}] Host backgrounded ({:?})", self.session_id, event);
                return self.stop().await;
            }
        } else if event.is_foregrounded()
            && state.lifecycle == LifecycleState::Stopped
            && self.ownership == ControllerOwnership::Owned
        {
            debug!("[{}] Host resumed; restarting scanner", self.session_id);
            return self.start().await;
        }

        Ok(())
    }

    /// Push a percentage scan window, or `None` for the full frame, downstream
    pub async fn update_scan_window(&self, window: Option<Rect>) -> Result<(), ScannerError> {
        if self.shared.is_disposed() {
            return Ok(());
        }

        match self.bridge.update_scan_window(window).await {
            Ok(()) => {
                self.shared.modify(|state| {
                    state.scan_window = window;
                    true
                });
                self.shared
                    .publish(&self.events, ScannerEvent::ScanWindowChanged { window });
                Ok(())
            }
            Err(failure) => {
                let error = classify_failure(failure);
                warn!("[{}] Failed to update scan window: {}", self.session_id, error);
                self.shared.modify(|state| {
                    state.error = Some(error.clone());
                    true
                });
                Err(error)
            }
        }
    }

    /// Cycle the torch between off and on
    pub async fn toggle_torch(&self) -> Result<(), ScannerError> {
        let state = self.require_running()?;

        let next = match state.torch {
            TorchState::Unavailable => {
                debug!("[{}] Torch unavailable", self.session_id);
                return Ok(());
            }
            TorchState::Off => TorchState::On,
            TorchState::On | TorchState::Auto => TorchState::Off,
        };

        self.bridge
            .set_torch(next)
            .await
            .map_err(classify_failure)?;

        self.shared.modify(|state| {
            state.torch = next;
            true
        });
        Ok(())
    }

    /// Set the zoom as a fraction of the camera's zoom range
    pub async fn set_zoom_scale(&self, scale: f64) -> Result<(), ScannerError> {
        self.require_running()?;

        let scale = if scale.is_finite() {
            scale.clamp(0.0, 1.0)
        } else {
            0.0
        };

        self.bridge
            .set_zoom_scale(scale)
            .await
            .map_err(classify_failure)?;

        self.shared.modify(|state| {
            state.zoom_scale = scale;
            true
        });
        Ok(())
    }

    pub async fn reset_zoom_scale(&self) -> Result<(), ScannerError> {
        self.require_running()?;

        self.bridge
            .reset_zoom_scale()
            .await
            .map_err(classify_failure)?;

        self.shared.modify(|state| {
            state.zoom_scale = 0.0;
            true
        });
        Ok(())
    }

    /// Restart the session on the opposite camera
    pub async fn switch_camera(&self) -> Result<(), ScannerError> {
        self.require_running()?;
        self.stop().await?;

        let facing = {
            let mut options = self.options.lock();
            options.facing = options.facing.flipped();
            options.facing
        };
        self.shared.modify(|state| {
            state.facing = facing;
            true
        });
        info!("[{}] Switching to {:?} camera", self.session_id, facing);

        self.start().await
    }

    /// Tear the coordinator down for good.
    ///
    /// Publishes a final `Uninitialized` state, cancels pending work and the
    /// event listener, and releases the camera when this coordinator owns it.
    pub async fn dispose(&self) {
        let previous = {
            let mut disposed = self.shared.disposed.lock();
            if *disposed {
                return;
            }
            let previous = self.shared.state.borrow().lifecycle.clone();
            let facing = self.options.lock().facing;
            self.shared
                .state
                .send_replace(ScannerState::uninitialized(facing));
            *disposed = true;
            previous
        };

        info!("[{}] Disposing scanner (was {})", self.session_id, previous);

        self.cancel.cancel();
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }

        let session_open = matches!(
            previous,
            LifecycleState::Starting | LifecycleState::Running | LifecycleState::Stopping
        );
        if session_open && self.ownership == ControllerOwnership::Owned {
            if let Err(failure) = self.bridge.stop().await {
                warn!(
                    "[{}] Failed to release camera on dispose: {}",
                    self.session_id,
                    classify_failure(failure)
                );
            }
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> ScannerState {
        self.shared.snapshot()
    }

    /// Watch every state change
    pub fn subscribe_state(&self) -> watch::Receiver<ScannerState> {
        self.shared.state.subscribe()
    }

    /// Receive detections, stream errors and scan-window changes
    pub fn subscribe_events(&self) -> broadcast::Receiver<ScannerEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn texture_size(&self) -> Option<Size> {
        self.shared.snapshot().texture_size
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn ownership(&self) -> ControllerOwnership {
        self.ownership
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// An owned native session that nobody has released yet
    pub(super) fn holds_open_session(&self) -> bool {
        self.ownership == ControllerOwnership::Owned
            && !self.shared.is_disposed()
            && matches!(
                self.shared.snapshot().lifecycle,
                LifecycleState::Starting | LifecycleState::Running | LifecycleState::Stopping
            )
    }

    fn require_running(&self) -> Result<ScannerState, ScannerError> {
        if self.shared.is_disposed() {
            return Err(ScannerError::controller(
                ScannerErrorCode::ControllerDisposed,
            ));
        }
        let state = self.shared.snapshot();
        if !state.is_running() {
            return Err(ScannerError::controller(
                ScannerErrorCode::ControllerUninitialized,
            ));
        }
        Ok(state)
    }

    /// Attach to the native event stream the first time only
    fn ensure_listener(&self) {
        if self.listener_established.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("[{}] Subscribing to detection events", self.session_id);

        let mut stream = self.bridge.event_stream();
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let speed = self.options.lock().detection_speed;
        let session_id = self.session_id;

        let handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if shared.is_disposed() {
                    break;
                }
                handle_bridge_event(&shared, &events, speed, event);
            }
            debug!("[{}] Detection event stream ended", session_id);
        });

        *self.listener.lock() = Some(handle);
    }
}

fn handle_bridge_event(
    shared: &Shared,
    events: &EventBus,
    speed: DetectionSpeed,
    event: BridgeEvent,
) {
    match event {
        BridgeEvent::Detection(detection) => {
            if !shared.snapshot().is_running() {
                trace!("Dropping detection received while not running");
                return;
            }
            if speed == DetectionSpeed::NoDuplicates && is_duplicate(shared, &detection) {
                trace!("Suppressing duplicate detection");
                return;
            }
            trace!("Forwarding {} barcode(s)", detection.barcodes.len());
            shared.publish(events, ScannerEvent::BarcodesDetected(detection));
        }
        BridgeEvent::Error {
            code,
            message,
            details,
        } => {
            let error = ScannerError::Bridge {
                code,
                message,
                details,
            };
            warn!("Detection stream error: {}", error);
            shared.modify(|state| {
                state.error = Some(error.clone());
                true
            });
            shared.publish(events, ScannerEvent::ScannerError { error });
        }
        BridgeEvent::TorchStateChanged(torch) => {
            shared.modify(|state| {
                let changed = state.torch != torch;
                state.torch = torch;
                changed
            });
        }
        BridgeEvent::ZoomScaleChanged(scale) => {
            shared.modify(|state| {
                let changed = state.zoom_scale != scale;
                state.zoom_scale = scale;
                changed
            });
        }
    }
}

fn is_duplicate(shared: &Shared, detection: &Detection) -> bool {
    let values: BTreeSet<String> = detection
        .raw_values()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut last = shared.last_detection.lock();
    if last.as_ref() == Some(&values) {
        return true;
    }
    *last = Some(values);
    false
}

impl Drop for DetectionCoordinator {
    fn drop(&mut self) {
        if self.holds_open_session() {
            warn!(
                "[{}] Dropped without dispose; owned camera session is still open",
                self.session_id
            );
        }
        self.cancel.cancel();
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}
