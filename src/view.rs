use crate::bridge::ScannerBridge;
use crate::config::{ScanWindowConfig, ScanviewConfig};
use crate::coordinator::{
    ControllerOwnership, DetectionCoordinator, DetectionCoordinatorBuilder, HostLifecycleEvent,
    ScannerState,
};
use crate::error::{Result, ScannerError};
use crate::events::ScannerEvent;
use crate::geometry::{Rect, Size};
use crate::scan_window::ScanWindowPipeline;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// What the presentation shell embeds: one preview with its scan window
pub struct ScannerView {
    coordinator: Arc<DetectionCoordinator>,
    pipeline: Option<ScanWindowPipeline>,
    widget_size: Option<Size>,
    auto_start: bool,
}

impl ScannerView {
    /// View that creates and owns its controller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &ScanviewConfig, bridge: Arc<dyn ScannerBridge>) -> Result<Self> {
        config.validate()?;

        let coordinator = DetectionCoordinatorBuilder::new()
            .bridge(bridge)
            .config(config.scanner.clone())
            .ownership(ControllerOwnership::Owned)
            .event_bus_capacity(config.system.event_bus_capacity)
            .build()?;

        Self::from_parts(
            &config.scan_window,
            Arc::new(coordinator),
            config.scanner.auto_start,
        )
    }

    /// View around a controller supplied by application code
    pub fn with_controller(
        scan_window: &ScanWindowConfig,
        coordinator: Arc<DetectionCoordinator>,
    ) -> Result<Self> {
        Self::from_parts(scan_window, coordinator, false)
    }

    fn from_parts(
        scan_window: &ScanWindowConfig,
        coordinator: Arc<DetectionCoordinator>,
        auto_start: bool,
    ) -> Result<Self> {
        let pipeline = ScanWindowPipeline::new(scan_window, Arc::clone(&coordinator))?;
        Ok(Self {
            coordinator,
            pipeline: Some(pipeline),
            widget_size: None,
            auto_start,
        })
    }

    /// Called once the view is inserted; starts scanning when configured to
    pub async fn attach(&mut self) -> std::result::Result<(), ScannerError> {
        if self.auto_start && self.coordinator.ownership() == ControllerOwnership::Owned {
            info!("Auto-starting scanner");
            self.start().await?;
        }
        Ok(())
    }

    pub async fn start(&mut self) -> std::result::Result<(), ScannerError> {
        self.coordinator.start().await?;
        self.refresh();
        Ok(())
    }

    pub async fn stop(&self) -> std::result::Result<(), ScannerError> {
        self.coordinator.stop().await
    }

    /// Restart on the other camera and re-map for its texture
    pub async fn switch_camera(&mut self) -> std::result::Result<(), ScannerError> {
        self.coordinator.switch_camera().await?;
        self.refresh();
        Ok(())
    }

    /// The layout engine gave the preview a new size
    pub fn on_layout(&mut self, widget_size: Size) -> Option<Rect> {
        self.widget_size = Some(widget_size);
        self.refresh()
    }

    pub async fn on_host_lifecycle_change(
        &mut self,
        event: HostLifecycleEvent,
    ) -> std::result::Result<(), ScannerError> {
        self.coordinator.on_host_lifecycle_change(event).await?;
        self.refresh();
        Ok(())
    }

    /// Re-run the scan-window mapping with the latest sizes
    fn refresh(&mut self) -> Option<Rect> {
        let pipeline = self.pipeline.as_mut()?;
        let widget_size = self.widget_size?;
        let Some(texture_size) = self.coordinator.texture_size() else {
            debug!("Texture size unknown; deferring scan window");
            return None;
        };
        pipeline.on_layout(widget_size, texture_size)
    }

    pub fn state(&self) -> ScannerState {
        self.coordinator.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ScannerState> {
        self.coordinator.subscribe_state()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ScannerEvent> {
        self.coordinator.subscribe_events()
    }

    /// Percentage scan window currently applied, for overlay clipping
    pub fn scan_window(&self) -> Option<Rect> {
        self.pipeline.as_ref().and_then(ScanWindowPipeline::current)
    }

    /// The applied window cut down to the visible texture
    pub fn overlay_window(&self) -> Option<Rect> {
        self.scan_window().map(|window| window.clamp_unit())
    }

    pub fn coordinator(&self) -> &Arc<DetectionCoordinator> {
        &self.coordinator
    }

    /// Remove the view: clear the scan window, then dispose an owned controller
    pub async fn dispose(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.teardown().await;
        }
        if self.coordinator.ownership() == ControllerOwnership::Owned {
            self.coordinator.dispose().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{Barcode, BarcodeFormat};
    use crate::bridge::SimulatedBridge;
    use crate::coordinator::LifecycleState;
    use crate::error::ScanviewError;
    use crate::geometry::FitMode;
    use std::time::Duration;
    use tokio::time::timeout;

    fn create_test_config() -> ScanviewConfig {
        let mut config = ScanviewConfig::default();
        config.scan_window.fit = FitMode::Cover;
        config.scan_window.window = Some([0.0, 0.0, 300.0, 400.0]);
        config
    }

    #[tokio::test]
    async fn test_full_window_maps_to_full_texture() {
        let bridge = Arc::new(SimulatedBridge::new(Size::new(480.0, 640.0)));
        let mut view = ScannerView::new(&create_test_config(), bridge.clone()).unwrap();

        // Layout before the camera is open defers the window
        assert_eq!(view.on_layout(Size::new(300.0, 400.0)), None);

        view.attach().await.unwrap();
        let window = view.scan_window().unwrap();
        assert!((window.left - 0.0).abs() < 1e-9);
        assert!((window.top - 0.0).abs() < 1e-9);
        assert!((window.right - 1.0).abs() < 1e-9);
        assert!((window.bottom - 1.0).abs() < 1e-9);

        view.dispose().await;
        assert_eq!(bridge.scan_window_updates(), vec![Some(window), None]);
        assert_eq!(view.state().lifecycle, LifecycleState::Uninitialized);
        assert!(!bridge.is_session_open());
    }

    #[tokio::test]
    async fn test_auto_start_disabled() {
        let bridge = Arc::new(SimulatedBridge::new(Size::new(480.0, 640.0)));
        let mut config = create_test_config();
        config.scanner.auto_start = false;
        let mut view = ScannerView::new(&config, bridge.clone()).unwrap();

        view.attach().await.unwrap();
        assert_eq!(bridge.start_calls(), 0);

        view.start().await.unwrap();
        assert_eq!(bridge.start_calls(), 1);
        view.dispose().await;
    }

    #[tokio::test]
    async fn test_external_controller_survives_view() {
        let bridge = Arc::new(SimulatedBridge::new(Size::new(480.0, 640.0)));
        let coordinator = Arc::new(
            DetectionCoordinatorBuilder::new()
                .bridge(bridge.clone())
                .ownership(ControllerOwnership::External)
                .build()
                .unwrap(),
        );
        let config = create_test_config();
        let mut view =
            ScannerView::with_controller(&config.scan_window, Arc::clone(&coordinator)).unwrap();

        view.attach().await.unwrap();
        assert_eq!(bridge.start_calls(), 0);

        view.start().await.unwrap();
        view.on_layout(Size::new(300.0, 400.0));
        view.on_host_lifecycle_change(HostLifecycleEvent::Paused)
            .await
            .unwrap();
        view.on_host_lifecycle_change(HostLifecycleEvent::Resumed)
            .await
            .unwrap();
        assert_eq!(view.state().lifecycle, LifecycleState::Stopped);

        view.dispose().await;
        assert!(!coordinator.is_disposed());
        assert_eq!(bridge.scan_window_updates().last(), Some(&None));
    }

    #[test]
    fn test_new_outside_runtime_is_an_error() {
        let bridge = Arc::new(SimulatedBridge::new(Size::new(480.0, 640.0)));
        let result = ScannerView::new(&create_test_config(), bridge);

        match result {
            Err(ScanviewError::System { message }) => {
                assert!(message.contains("tokio runtime"));
            }
            Err(other) => panic!("Unexpected error {}", other),
            Ok(_) => panic!("Expected an error outside a runtime"),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let bridge = Arc::new(SimulatedBridge::new(Size::new(480.0, 640.0)));
        let mut config = create_test_config();
        config.scan_window.update_threshold = -1.0;

        assert!(matches!(
            ScannerView::new(&config, bridge),
            Err(ScanviewError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_switch_camera_remaps_for_new_texture() {
        let bridge = Arc::new(SimulatedBridge::new(Size::new(480.0, 640.0)));
        let mut view = ScannerView::new(&create_test_config(), bridge.clone()).unwrap();
        view.on_layout(Size::new(300.0, 400.0));
        view.attach().await.unwrap();
        let back = view.scan_window().unwrap();

        // The front camera delivers a landscape texture
        bridge.set_texture_size(Size::new(640.0, 480.0));
        view.switch_camera().await.unwrap();

        let front = view.scan_window().unwrap();
        assert!((front.left - 0.21875).abs() < 1e-9);
        assert!((front.right - 0.78125).abs() < 1e-9);
        let overlay = view.overlay_window().unwrap();
        assert!(overlay.top >= 0.0 && overlay.bottom <= 1.0);
        assert!((overlay.left - front.left).abs() < 1e-9);

        view.dispose().await;
        assert_eq!(
            bridge.scan_window_updates(),
            vec![Some(back), Some(front), None]
        );
    }

    #[tokio::test]
    async fn test_detections_reach_view_subscribers() {
        let bridge = Arc::new(SimulatedBridge::new(Size::new(480.0, 640.0)));
        let mut view = ScannerView::new(&create_test_config(), bridge.clone()).unwrap();
        let mut events = view.subscribe_events();

        view.attach().await.unwrap();
        bridge.emit_detection(vec![Barcode::new(BarcodeFormat::QrCode, "https://example.com")]);

        let event = timeout(Duration::from_millis(200), async {
            loop {
                if let Ok(ScannerEvent::BarcodesDetected(detection)) = events.recv().await {
                    return detection;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(
            event.barcodes[0].raw_value.as_deref(),
            Some("https://example.com")
        );

        view.dispose().await;
    }
}
