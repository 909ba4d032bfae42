use super::{BridgeEvent, BridgeFailure, ScannerBridge, StartArgs, StartOptions};
use crate::barcode::{Barcode, Detection, TorchState};
use crate::geometry::{Rect, Size};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// In-process bridge standing in for a native camera and detector.
///
/// Records every call so tests and the demo binary can observe exactly what
/// the coordinator asked of the native side.
pub struct SimulatedBridge {
    texture_size: Mutex<Size>,
    start_latency: Duration,
    session_open: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    subscriptions: AtomicUsize,
    start_failures: Mutex<VecDeque<BridgeFailure>>,
    stop_failures: Mutex<VecDeque<BridgeFailure>>,
    scan_window_failures: Mutex<VecDeque<BridgeFailure>>,
    scan_windows: Mutex<Vec<Option<Rect>>>,
    last_options: Mutex<Option<StartOptions>>,
    torch: Mutex<TorchState>,
    zoom_scale: Mutex<f64>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<BridgeEvent>>>,
}

impl SimulatedBridge {
    pub fn new(texture_size: Size) -> Self {
        Self {
            texture_size: Mutex::new(texture_size),
            start_latency: Duration::ZERO,
            session_open: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
            start_failures: Mutex::new(VecDeque::new()),
            stop_failures: Mutex::new(VecDeque::new()),
            scan_window_failures: Mutex::new(VecDeque::new()),
            scan_windows: Mutex::new(Vec::new()),
            last_options: Mutex::new(None),
            torch: Mutex::new(TorchState::Off),
            zoom_scale: Mutex::new(0.0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Delay every start call, simulating the camera warming up
    pub fn with_start_latency(mut self, latency: Duration) -> Self {
        self.start_latency = latency;
        self
    }

    /// Texture size reported by the next session, e.g. a different camera
    pub fn set_texture_size(&self, texture_size: Size) {
        *self.texture_size.lock() = texture_size;
    }

    /// Make the next start call fail with `failure`
    pub fn fail_next_start(&self, failure: BridgeFailure) {
        self.start_failures.lock().push_back(failure);
    }

    /// Make the next stop call fail with `failure`
    pub fn fail_next_stop(&self, failure: BridgeFailure) {
        self.stop_failures.lock().push_back(failure);
    }

    /// Make the next scan-window update fail with `failure`
    pub fn fail_next_update_scan_window(&self, failure: BridgeFailure) {
        self.scan_window_failures.lock().push_back(failure);
    }

    /// Deliver an event to every attached listener
    pub fn emit(&self, event: BridgeEvent) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| listener.unbounded_send(event.clone()).is_ok());
    }

    pub fn emit_detection(&self, barcodes: Vec<Barcode>) {
        let mut detection = Detection::new(barcodes);
        detection.image_size = Some(*self.texture_size.lock());
        self.emit(BridgeEvent::Detection(detection));
    }

    pub fn emit_error(&self, code: &str, message: Option<&str>) {
        self.emit(BridgeEvent::Error {
            code: code.to_string(),
            message: message.map(str::to_string),
            details: None,
        });
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Number of times a listener was attached to the event stream
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Every scan window accepted so far, in arrival order
    pub fn scan_window_updates(&self) -> Vec<Option<Rect>> {
        self.scan_windows.lock().clone()
    }

    pub fn is_session_open(&self) -> bool {
        self.session_open.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<StartOptions> {
        self.last_options.lock().clone()
    }

    pub fn torch(&self) -> TorchState {
        *self.torch.lock()
    }

    pub fn zoom_scale(&self) -> f64 {
        *self.zoom_scale.lock()
    }
}

#[async_trait]
impl ScannerBridge for SimulatedBridge {
    async fn start(&self, options: StartOptions) -> Result<StartArgs, BridgeFailure> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);

        if !self.start_latency.is_zero() {
            tokio::time::sleep(self.start_latency).await;
        }

        let failure = self.start_failures.lock().pop_front();
        if let Some(failure) = failure {
            debug!("Simulated start failure: {:?}", failure);
            return Err(failure);
        }

        if self.session_open.swap(true, Ordering::SeqCst) {
            return Err(BridgeFailure::platform(
                "ALREADY_STARTED",
                Some("Camera session is already open"),
            ));
        }

        let torch = if options.torch_enabled {
            TorchState::On
        } else {
            TorchState::Off
        };
        *self.torch.lock() = torch;
        *self.last_options.lock() = Some(options);

        Ok(StartArgs {
            texture_size: *self.texture_size.lock(),
            torch,
            zoom_scale: *self.zoom_scale.lock(),
            number_of_cameras: Some(2),
        })
    }

    async fn stop(&self) -> Result<(), BridgeFailure> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);

        let failure = self.stop_failures.lock().pop_front();
        if let Some(failure) = failure {
            return Err(failure);
        }

        self.session_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn update_scan_window(&self, window: Option<Rect>) -> Result<(), BridgeFailure> {
        let failure = self.scan_window_failures.lock().pop_front();
        if let Some(failure) = failure {
            debug!("Simulated scan window failure: {:?}", failure);
            return Err(failure);
        }

        self.scan_windows.lock().push(window);
        Ok(())
    }

    async fn set_torch(&self, state: TorchState) -> Result<(), BridgeFailure> {
        *self.torch.lock() = state;
        self.emit(BridgeEvent::TorchStateChanged(state));
        Ok(())
    }

    async fn set_zoom_scale(&self, scale: f64) -> Result<(), BridgeFailure> {
        *self.zoom_scale.lock() = scale;
        self.emit(BridgeEvent::ZoomScaleChanged(scale));
        Ok(())
    }

    async fn reset_zoom_scale(&self) -> Result<(), BridgeFailure> {
        self.set_zoom_scale(0.0).await
    }

    fn event_stream(&self) -> BoxStream<'static, BridgeEvent> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded();
        self.listeners.lock().push(sender);
        receiver.boxed()
    }
}
