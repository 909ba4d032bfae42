use super::*;
use crate::bridge::{BridgeFailure, ScannerBridge, SimulatedBridge};
use crate::config::ScanWindowConfig;
use crate::coordinator::{DetectionCoordinator, DetectionCoordinatorBuilder};
use crate::geometry::{FitMode, Rect, Size};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn window(left: f64, top: f64, right: f64, bottom: f64) -> Rect {
    Rect::from_ltrb(left, top, right, bottom)
}

#[test]
fn test_first_window_always_applies() {
    let mut hysteresis = ScanWindowHysteresis::new(0.5);
    let first = window(0.1, 0.1, 0.2, 0.2);

    assert_eq!(hysteresis.maybe_update(first), Some(first));
    assert_eq!(hysteresis.last_applied(), Some(first));
}

#[test]
fn test_zero_threshold_applies_each_distinct_window_once() {
    let mut hysteresis = ScanWindowHysteresis::new(0.0);
    let a = window(0.1, 0.1, 0.5, 0.5);
    let b = window(0.1, 0.1, 0.5, 0.5000001);
    let c = window(0.2, 0.1, 0.6, 0.5);

    let applied: Vec<Rect> = [a, a, b, b, c, c]
        .into_iter()
        .filter_map(|w| hysteresis.maybe_update(w))
        .collect();

    assert_eq!(applied, vec![a, b, c]);
}

#[test]
fn test_translation_with_zero_threshold_applies() {
    let mut hysteresis = ScanWindowHysteresis::new(0.0);
    hysteresis.maybe_update(window(0.1, 0.1, 0.5, 0.5));

    // Same size, different position
    let moved = window(0.2, 0.2, 0.6, 0.6);
    assert_eq!(hysteresis.maybe_update(moved), Some(moved));
}

#[test]
fn test_threshold_coalesces_small_changes() {
    let mut hysteresis = ScanWindowHysteresis::new(0.05);
    let first = window(0.1, 0.1, 0.5, 0.5);
    hysteresis.maybe_update(first);

    // Width and height both change by 0.01
    assert_eq!(hysteresis.maybe_update(window(0.1, 0.1, 0.51, 0.51)), None);
    // Translation alone never crosses a size threshold
    assert_eq!(hysteresis.maybe_update(window(0.3, 0.3, 0.7, 0.7)), None);
    assert_eq!(hysteresis.last_applied(), Some(first));

    // Height grows past the threshold
    let taller = window(0.1, 0.1, 0.5, 0.6);
    assert_eq!(hysteresis.maybe_update(taller), Some(taller));
    assert_eq!(hysteresis.last_applied(), Some(taller));
}

#[test]
fn test_disabled_never_applies() {
    let mut hysteresis = ScanWindowHysteresis::disabled();
    assert!(!hysteresis.is_enabled());
    assert_eq!(hysteresis.maybe_update(window(0.0, 0.0, 1.0, 1.0)), None);
    assert!(!hysteresis.teardown());

    let from_config = ScanWindowHysteresis::from_config(&ScanWindowConfig::default());
    assert!(!from_config.is_enabled());
}

#[test]
fn test_negative_threshold_counts_as_zero() {
    assert_eq!(ScanWindowHysteresis::new(-1.0).threshold(), 0.0);
    assert_eq!(ScanWindowHysteresis::new(f64::NAN).threshold(), 0.0);
}

#[test]
fn test_teardown_resets_and_requests_clear() {
    let mut hysteresis = ScanWindowHysteresis::new(0.1);
    let first = window(0.1, 0.1, 0.5, 0.5);
    hysteresis.maybe_update(first);

    assert!(hysteresis.teardown());
    assert_eq!(hysteresis.last_applied(), None);

    // After teardown the next window counts as the first one again
    assert_eq!(hysteresis.maybe_update(first), Some(first));
}

#[test]
fn test_rejected_window_is_forgotten() {
    let mut hysteresis = ScanWindowHysteresis::new(0.1);
    let first = window(0.1, 0.1, 0.5, 0.5);
    hysteresis.maybe_update(first);

    assert!(hysteresis.reject(first));
    assert_eq!(hysteresis.last_applied(), None);
    // Same window again is sent again
    assert_eq!(hysteresis.maybe_update(first), Some(first));
}

#[test]
fn test_stale_rejection_keeps_newer_window() {
    let mut hysteresis = ScanWindowHysteresis::new(0.0);
    let first = window(0.1, 0.1, 0.5, 0.5);
    let second = window(0.1, 0.1, 0.6, 0.6);
    hysteresis.maybe_update(first);
    hysteresis.maybe_update(second);

    assert!(!hysteresis.reject(first));
    assert_eq!(hysteresis.last_applied(), Some(second));
}

fn create_coordinator(bridge: &Arc<SimulatedBridge>) -> Arc<DetectionCoordinator> {
    Arc::new(
        DetectionCoordinatorBuilder::new()
            .bridge(Arc::clone(bridge) as Arc<dyn ScannerBridge>)
            .build()
            .unwrap(),
    )
}

fn scan_window_config(threshold: f64) -> ScanWindowConfig {
    ScanWindowConfig {
        fit: FitMode::Fill,
        window: Some([50.0, 100.0, 150.0, 300.0]),
        update_threshold: threshold,
    }
}

#[tokio::test]
async fn test_pipeline_dispatches_in_order() {
    let texture = Size::new(400.0, 800.0);
    let bridge = Arc::new(SimulatedBridge::new(texture));
    let coordinator = create_coordinator(&bridge);
    let mut pipeline =
        ScanWindowPipeline::new(&scan_window_config(0.0), Arc::clone(&coordinator)).unwrap();

    let first = pipeline.on_layout(Size::new(200.0, 400.0), texture);
    assert_eq!(first, Some(Rect::from_ltrb(0.25, 0.25, 0.75, 0.75)));

    // Same layout again: nothing new to send
    assert_eq!(pipeline.on_layout(Size::new(200.0, 400.0), texture), None);

    let second = pipeline.on_layout(Size::new(400.0, 400.0), texture);
    assert_eq!(second, Some(Rect::from_ltrb(0.125, 0.25, 0.375, 0.75)));
    assert_eq!(pipeline.current(), second);

    pipeline.teardown().await;

    assert_eq!(bridge.scan_window_updates(), vec![first, second, None]);
    assert_eq!(coordinator.state().scan_window, None);
}

#[tokio::test]
async fn test_pipeline_skips_degenerate_layouts() {
    let texture = Size::new(400.0, 800.0);
    let bridge = Arc::new(SimulatedBridge::new(texture));
    let coordinator = create_coordinator(&bridge);
    let mut pipeline = ScanWindowPipeline::new(&scan_window_config(0.0), coordinator).unwrap();

    assert_eq!(pipeline.on_layout(Size::new(0.0, 400.0), texture), None);
    assert_eq!(pipeline.on_layout(Size::new(200.0, 400.0), Size::ZERO), None);
    assert_eq!(pipeline.current(), None);

    pipeline.teardown().await;
    assert_eq!(bridge.scan_window_updates(), vec![None]);
}

#[tokio::test]
async fn test_pipeline_without_window_sends_nothing() {
    let texture = Size::new(400.0, 800.0);
    let bridge = Arc::new(SimulatedBridge::new(texture));
    let coordinator = create_coordinator(&bridge);
    let mut pipeline = ScanWindowPipeline::new(&ScanWindowConfig::default(), coordinator).unwrap();

    assert_eq!(pipeline.on_layout(Size::new(200.0, 400.0), texture), None);
    pipeline.teardown().await;

    assert!(bridge.scan_window_updates().is_empty());
}

#[tokio::test]
async fn test_rejected_window_is_resent_on_next_layout() {
    let texture = Size::new(400.0, 800.0);
    let widget = Size::new(200.0, 400.0);
    let bridge = Arc::new(SimulatedBridge::new(texture));
    let coordinator = create_coordinator(&bridge);
    let mut pipeline =
        ScanWindowPipeline::new(&scan_window_config(0.0), Arc::clone(&coordinator)).unwrap();
    bridge.fail_next_update_scan_window(BridgeFailure::platform("CAMERA_ERROR", Some("busy")));

    let expected = Rect::from_ltrb(0.25, 0.25, 0.75, 0.75);
    assert_eq!(pipeline.on_layout(widget, texture), Some(expected));

    // Wait for the native side to refuse it
    timeout(Duration::from_secs(1), async {
        while pipeline.current().is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(coordinator.state().error.is_some());
    assert_eq!(coordinator.state().scan_window, None);

    // The identical layout is no longer suppressed
    assert_eq!(pipeline.on_layout(widget, texture), Some(expected));
    pipeline.teardown().await;

    assert_eq!(bridge.scan_window_updates(), vec![Some(expected), None]);
}
