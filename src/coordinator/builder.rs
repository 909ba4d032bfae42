use super::detection::DetectionCoordinator;
use super::lifecycle::ControllerOwnership;
use crate::bridge::{ScannerBridge, StartOptions};
use crate::config::ScannerConfig;
use crate::error::{Result, ScanviewError};
use crate::events::EventBus;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a detection coordinator
pub struct DetectionCoordinatorBuilder {
    bridge: Option<Arc<dyn ScannerBridge>>,
    config: ScannerConfig,
    ownership: ControllerOwnership,
    event_bus: Option<EventBus>,
    event_bus_capacity: usize,
}

impl DetectionCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            bridge: None,
            config: ScannerConfig::default(),
            ownership: ControllerOwnership::Owned,
            event_bus: None,
            event_bus_capacity: 64,
        }
    }

    pub fn bridge(mut self, bridge: Arc<dyn ScannerBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ownership(mut self, ownership: ControllerOwnership) -> Self {
        self.ownership = ownership;
        self
    }

    /// Share an existing bus instead of creating one
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<DetectionCoordinator> {
        let bridge = self
            .bridge
            .ok_or_else(|| ScanviewError::system("Scanner bridge must be specified"))?;

        let events = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(self.event_bus_capacity));
        let start_delay = self.config.start_delay_ms.map(Duration::from_millis);

        Ok(DetectionCoordinator::new(
            bridge,
            StartOptions::from_config(&self.config),
            self.ownership,
            start_delay,
            events,
        ))
    }
}

impl Default for DetectionCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
