use super::hysteresis::ScanWindowHysteresis;
use crate::coordinator::DetectionCoordinator;
use crate::error::{Result, ScanviewError};
use crate::geometry::Rect;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sends scan-window updates to the native side one at a time.
///
/// Callers never wait on the bridge; updates are queued and applied strictly
/// in the order they were dispatched. A rejected window is handed back to the
/// hysteresis so it is not mistaken for the applied one.
pub struct ScanWindowDispatcher {
    sender: mpsc::UnboundedSender<Option<Rect>>,
    task: JoinHandle<()>,
}

impl ScanWindowDispatcher {
    /// Start the worker on the current tokio runtime
    pub fn spawn(
        coordinator: Arc<DetectionCoordinator>,
        hysteresis: Arc<Mutex<ScanWindowHysteresis>>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ScanviewError::system(format!("Scan window dispatcher needs a tokio runtime: {}", e))
        })?;

        let (sender, mut receiver) = mpsc::unbounded_channel::<Option<Rect>>();

        let task = runtime.spawn(async move {
            while let Some(window) = receiver.recv().await {
                if let Err(e) = coordinator.update_scan_window(window).await {
                    warn!("Scan window update failed: {}", e);
                    if let Some(window) = window {
                        hysteresis.lock().reject(window);
                    }
                }
            }
            debug!("Scan window dispatcher finished");
        });

        Ok(Self { sender, task })
    }

    /// Queue an update without waiting for it to be applied
    pub fn dispatch(&self, window: Option<Rect>) {
        if self.sender.send(window).is_err() {
            warn!("Scan window dispatcher is closed; dropping update");
        }
    }

    /// Apply every queued update, then stop
    pub async fn close(self) {
        drop(self.sender);
        if let Err(e) = self.task.await {
            warn!("Scan window dispatcher task failed: {}", e);
        }
    }
}
