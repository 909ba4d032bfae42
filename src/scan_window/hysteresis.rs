use crate::config::ScanWindowConfig;
use crate::geometry::Rect;
use tracing::debug;

/// Debounces scan-window updates by size change.
///
/// A new window is either adopted completely or ignored; nothing is
/// interpolated.
#[derive(Debug, Clone)]
pub struct ScanWindowHysteresis {
    enabled: bool,
    threshold: f64,
    last_applied: Option<Rect>,
}

impl ScanWindowHysteresis {
    /// Enabled controller; negative or NaN thresholds count as zero
    pub fn new(threshold: f64) -> Self {
        Self {
            enabled: true,
            threshold: if threshold.is_finite() {
                threshold.max(0.0)
            } else {
                0.0
            },
            last_applied: None,
        }
    }

    /// No scan window was requested; every update is ignored
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            threshold: 0.0,
            last_applied: None,
        }
    }

    pub fn from_config(config: &ScanWindowConfig) -> Self {
        if config.window.is_some() {
            Self::new(config.update_threshold)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn last_applied(&self) -> Option<Rect> {
        self.last_applied
    }

    /// Returns the window to push downstream, if any
    pub fn maybe_update(&mut self, new_window: Rect) -> Option<Rect> {
        if !self.enabled {
            return None;
        }

        let Some(last) = self.last_applied else {
            debug!("Applying first scan window {}", new_window);
            self.last_applied = Some(new_window);
            return Some(new_window);
        };

        if last.bitwise_eq(&new_window) {
            return None;
        }

        if self.threshold > 0.0 {
            let d_width = (new_window.width() - last.width()).abs();
            let d_height = (new_window.height() - last.height()).abs();

            if d_width < self.threshold && d_height < self.threshold {
                debug!(
                    "Ignoring scan window {} (dw {:.4}, dh {:.4} below {})",
                    new_window, d_width, d_height, self.threshold
                );
                return None;
            }
        }

        debug!("Applying scan window {}", new_window);
        self.last_applied = Some(new_window);
        Some(new_window)
    }

    /// The native side refused `window`; forget it so the next layout pass
    /// sends it again.
    ///
    /// Returns false if a newer window has been applied since.
    pub fn reject(&mut self, window: Rect) -> bool {
        match self.last_applied {
            Some(last) if last.bitwise_eq(&window) => {
                debug!("Scan window {} was rejected; will retry", window);
                self.last_applied = None;
                true
            }
            _ => false,
        }
    }

    /// Forget the applied window.
    ///
    /// Returns true when a final "clear" must be sent so the native side goes
    /// back to scanning the full frame.
    pub fn teardown(&mut self) -> bool {
        self.last_applied = None;
        self.enabled
    }
}
