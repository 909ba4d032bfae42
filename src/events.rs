use crate::barcode::Detection;
use crate::error::{EventBusError, ScannerError};
use crate::geometry::Rect;
use tokio::sync::broadcast;
use tracing::trace;

/// Events delivered to application code while scanning
#[derive(Debug, Clone)]
pub enum ScannerEvent {
    /// The native detector decoded one or more barcodes
    BarcodesDetected(Detection),
    /// The native side reported an error on the event stream
    ScannerError { error: ScannerError },
    /// A new scan window was pushed to the native side; `None` means full frame
    ScanWindowChanged { window: Option<Rect> },
}

impl ScannerEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ScannerEvent::BarcodesDetected(detection) => {
                format!("{} barcode(s) detected", detection.barcodes.len())
            }
            ScannerEvent::ScannerError { error } => format!("Scanner error: {}", error),
            ScannerEvent::ScanWindowChanged { window: Some(window) } => {
                format!("Scan window set to {}", window)
            }
            ScannerEvent::ScanWindowChanged { window: None } => "Scan window cleared".to_string(),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ScannerEvent::BarcodesDetected(_) => "barcodes_detected",
            ScannerEvent::ScannerError { .. } => "scanner_error",
            ScannerEvent::ScanWindowChanged { .. } => "scan_window_changed",
        }
    }
}

/// Broadcast channel fanning scanner events out to every subscriber
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScannerEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of subscribers that will see the event.
    pub fn publish(&self, event: ScannerEvent) -> Result<usize, EventBusError> {
        trace!("Publishing event: {}", event.description());

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish without caring whether anyone is listening
    pub fn publish_lossy(&self, event: ScannerEvent) {
        if let Err(e) = self.publish(event) {
            trace!("Event dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{Barcode, BarcodeFormat};

    fn detection_event(value: &str) -> ScannerEvent {
        ScannerEvent::BarcodesDetected(Detection::new(vec![Barcode::new(
            BarcodeFormat::QrCode,
            value,
        )]))
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus.publish(detection_event("hello")).unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            ScannerEvent::BarcodesDetected(detection) => {
                assert_eq!(detection.barcodes[0].raw_value.as_deref(), Some("hello"));
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        assert!(event_bus.publish(detection_event("x")).is_err());
        // Lossy publish just drops it
        event_bus.publish_lossy(detection_event("x"));
    }

    #[test]
    fn test_event_descriptions() {
        let cleared = ScannerEvent::ScanWindowChanged { window: None };
        assert_eq!(cleared.description(), "Scan window cleared");

        let error = ScannerEvent::ScannerError {
            error: ScannerError::bridge("CAMERA_ERROR", None),
        };
        assert_eq!(error.event_type(), "scanner_error");
        assert!(error.description().contains("CAMERA_ERROR"));
    }
}
