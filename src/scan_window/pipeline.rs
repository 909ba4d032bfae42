use super::dispatcher::ScanWindowDispatcher;
use super::hysteresis::ScanWindowHysteresis;
use crate::config::ScanWindowConfig;
use crate::coordinator::DetectionCoordinator;
use crate::error::{Result, ScannerError};
use crate::geometry::{compute_texture_relative_window, FitMode, Rect, Size};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Layout size in, native scan-window updates out
pub struct ScanWindowPipeline {
    fit: FitMode,
    requested: Option<Rect>,
    hysteresis: Arc<Mutex<ScanWindowHysteresis>>,
    dispatcher: ScanWindowDispatcher,
}

impl ScanWindowPipeline {
    /// Fails when called outside a tokio runtime
    pub fn new(config: &ScanWindowConfig, coordinator: Arc<DetectionCoordinator>) -> Result<Self> {
        let hysteresis = Arc::new(Mutex::new(ScanWindowHysteresis::from_config(config)));
        let dispatcher = ScanWindowDispatcher::spawn(coordinator, Arc::clone(&hysteresis))?;

        Ok(Self {
            fit: config.fit,
            requested: config.window_rect(),
            hysteresis,
            dispatcher,
        })
    }

    /// Recompute the texture-space window for a new layout.
    ///
    /// Returns the window that was queued for the native side, if any.
    /// Degenerate sizes are skipped until the next layout pass.
    pub fn on_layout(&mut self, widget_size: Size, texture_size: Size) -> Option<Rect> {
        let requested = self.requested?;

        let window =
            match compute_texture_relative_window(self.fit, requested, texture_size, widget_size) {
                Ok(window) => window,
                Err(ScannerError::DegenerateGeometry { texture, widget }) => {
                    debug!(
                        "Skipping scan window update for texture {} and widget {}",
                        texture, widget
                    );
                    return None;
                }
                Err(e) => {
                    debug!("Skipping scan window update: {}", e);
                    return None;
                }
            };

        let applied = self.hysteresis.lock().maybe_update(window)?;
        if applied.is_empty() {
            debug!("Scan window {} has no area; nothing will be detected", applied);
        }
        self.dispatcher.dispatch(Some(applied));
        Some(applied)
    }

    /// Percentage window last handed downstream and not rejected
    pub fn current(&self) -> Option<Rect> {
        self.hysteresis.lock().last_applied()
    }

    /// Clear the native scan window and flush pending updates
    pub async fn teardown(self) {
        let clear = self.hysteresis.lock().teardown();
        if clear {
            self.dispatcher.dispatch(None);
        }
        self.dispatcher.close().await;
    }
}
