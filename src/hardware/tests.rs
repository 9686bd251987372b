use super::*;
use crate::config::{Facing, HardwareConfig, TorchlightConfig};
use crate::error::{CaptureError, ErrorCategory, TorchError};
use crate::events::EventBus;
use crate::status::ErrorSlot;
use std::time::Duration;

fn create_test_config() -> HardwareConfig {
    TorchlightConfig::default().hardware
}

fn session_for(device: &SimulatedCaptureDevice) -> HardwareSession {
    HardwareSession::new(Arc::new(device.clone()), &create_test_config())
}

#[tokio::test]
async fn test_acquire_falls_back_through_constraints() {
    let device = SimulatedCaptureDevice::new();
    device.script_opens([
        OpenScript::Fail(CaptureError::Overconstrained {
            constraint: "facingMode".to_string(),
        }),
        OpenScript::Fail(CaptureError::NotReadable {
            device: "camera0".to_string(),
            details: "busy".to_string(),
        }),
    ]);
    let mut session = session_for(&device);

    session.acquire().await.unwrap();

    assert_eq!(
        device.open_attempts(),
        CaptureConstraints::fallback_chain(Facing::Environment)
    );
    assert!(session.is_live());
    assert_eq!(session.stats().acquisitions, 1);
    assert_eq!(device.active_tracks(), 1);
}

#[tokio::test]
async fn test_partial_streams_are_released_before_next_attempt() {
    let device = SimulatedCaptureDevice::new();
    device.script_opens([
        OpenScript::Partial,
        OpenScript::Fail(CaptureError::NotFound),
    ]);
    let mut session = session_for(&device);

    session.acquire().await.unwrap();

    assert_eq!(device.opened_tracks(), 2);
    assert_eq!(device.active_tracks(), 1);
    assert_eq!(device.open_attempts().len(), 3);
}

#[tokio::test]
async fn test_acquire_failure_is_classified() {
    let denied = SimulatedCaptureDevice::new();
    denied.script_opens(vec![
        OpenScript::Fail(CaptureError::NotAllowed {
            device: "camera0".to_string(),
        });
        3
    ]);
    let mut session = session_for(&denied);
    assert!(matches!(
        session.acquire().await,
        Err(TorchError::PermissionDenied { .. })
    ));

    let missing = SimulatedCaptureDevice::new();
    missing.script_opens(vec![OpenScript::Fail(CaptureError::NotFound); 3]);
    let mut session = session_for(&missing);
    assert!(matches!(
        session.apply(true).await,
        Err(TorchError::HardwareUnavailable { .. })
    ));
    assert!(missing.writes().is_empty());
}

#[tokio::test]
async fn test_live_handle_is_reused() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);

    session.apply(true).await.unwrap();
    session.apply(true).await.unwrap();

    let stats = session.stats();
    assert_eq!(stats.acquisitions, 1);
    assert_eq!(stats.on_requests, 2);
    assert_eq!(stats.hardware_writes, 1);
    assert_eq!(device.open_attempts().len(), 1);
    assert!(device.torch_on());
}

#[tokio::test]
async fn test_fill_light_hint_sent_when_supported() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);

    session.apply(true).await.unwrap();
    session.apply(false).await.unwrap();

    assert_eq!(
        device.writes(),
        vec![
            TorchConstraint::with_fill_light(true),
            TorchConstraint::with_fill_light(false),
        ]
    );
}

#[tokio::test]
async fn test_rejected_fill_light_retries_reduced_constraint() {
    let device = SimulatedCaptureDevice::new().rejecting_fill_light();
    let mut session = session_for(&device);

    session.apply(true).await.unwrap();

    assert_eq!(device.writes(), vec![TorchConstraint::torch_only(true)]);
    assert_eq!(session.stats().acquisitions, 1);
}

#[tokio::test]
async fn test_unsupported_torch_only_reported_when_turning_on() {
    let device = SimulatedCaptureDevice::new().with_torch_supported(false);
    let mut session = session_for(&device);

    assert!(matches!(
        session.apply(true).await,
        Err(TorchError::HardwareUnsupported { .. })
    ));
    assert!(session.apply(false).await.is_ok());
    assert!(device.writes().is_empty());

    let opaque = SimulatedCaptureDevice::new().without_capabilities();
    let mut session = session_for(&opaque);
    assert!(matches!(
        session.apply(true).await,
        Err(TorchError::HardwareUnsupported { .. })
    ));
    assert!(session.apply(false).await.is_ok());
}

#[tokio::test]
async fn test_failed_write_reacquires_once() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);
    session.acquire().await.unwrap();

    // Primary and reduced constraint both fail on the first track
    device.fail_next_writes(2);
    session.apply(true).await.unwrap();

    assert_eq!(session.stats().acquisitions, 2);
    assert_eq!(device.opened_tracks(), 2);
    assert_eq!(device.active_tracks(), 1);
    assert!(device.torch_on());
}

#[tokio::test]
async fn test_reacquire_is_bounded() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);

    device.fail_next_writes(100);
    let result = session.apply(true).await;

    assert!(matches!(
        result,
        Err(TorchError::TransientApplyFailure { .. })
    ));
    assert_eq!(session.stats().acquisitions, 2);
}

#[tokio::test]
async fn test_failed_off_write_does_not_reacquire() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);
    session.apply(true).await.unwrap();

    device.fail_next_writes(2);
    assert!(matches!(
        session.apply(false).await,
        Err(TorchError::TransientApplyFailure { .. })
    ));
    assert_eq!(session.stats().acquisitions, 1);
}

#[tokio::test]
async fn test_dead_track_is_replaced() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);
    session.apply(true).await.unwrap();

    device.kill_tracks();
    assert!(!session.is_live());

    session.apply(true).await.unwrap();
    assert_eq!(session.stats().acquisitions, 2);
    assert_eq!(device.active_tracks(), 1);
}

#[tokio::test]
async fn test_turning_off_without_track_does_not_acquire() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);

    session.apply(false).await.unwrap();

    assert!(device.open_attempts().is_empty());
    assert_eq!(session.stats().off_requests, 1);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let device = SimulatedCaptureDevice::new();
    let mut session = session_for(&device);
    session.apply(true).await.unwrap();

    session.release();
    session.release();

    assert_eq!(device.active_tracks(), 0);
    assert!(!device.torch_on());
    assert_eq!(session.stats().releases, 1);
    assert_eq!(session.last_applied(), None);
}

#[tokio::test]
async fn test_sink_failure_is_tolerated() {
    let device = SimulatedCaptureDevice::new().with_failing_sink();
    let mut session = session_for(&device);

    session.apply(true).await.unwrap();
    assert!(device.torch_on());
}

#[tokio::test]
async fn test_dropping_session_stops_tracks() {
    let device = SimulatedCaptureDevice::new();
    {
        let mut session = session_for(&device);
        session.apply(true).await.unwrap();
        assert_eq!(device.active_tracks(), 1);
    }
    assert_eq!(device.active_tracks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_turn_on_shares_one_acquisition() {
    let device = SimulatedCaptureDevice::new().with_open_delay(Duration::from_millis(300));
    let events = EventBus::new(16);
    let driver = TorchDriver::new(
        session_for(&device),
        ErrorSlot::new(events.clone()),
        events,
    );

    let (first, second) = tokio::join!(driver.set_torch(true), driver.set_torch(true));

    assert!(first && second);
    let stats = driver.stats().await;
    assert_eq!(stats.acquisitions, 1);
    assert_eq!(device.open_attempts().len(), 1);
}

#[tokio::test]
async fn test_driver_reports_failures_to_error_slot() {
    let device = SimulatedCaptureDevice::new().with_torch_supported(false);
    let events = EventBus::new(16);
    let errors = ErrorSlot::new(events.clone());
    let driver = TorchDriver::new(session_for(&device), errors.clone(), events);

    assert!(!driver.set_torch(true).await);
    assert_eq!(errors.category(), Some(ErrorCategory::HardwareUnsupported));

    // Turning off never surfaces an unsupported error
    errors.clear();
    assert!(driver.set_torch(false).await);
    assert!(errors.current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_acquisition_stops_opened_track() {
    let device = SimulatedCaptureDevice::new().with_sink_delay(Duration::from_secs(60));
    let events = EventBus::new(16);
    let driver = TorchDriver::new(
        session_for(&device),
        ErrorSlot::new(events.clone()),
        events,
    );

    // Opened, still waiting for its sink when the request is dropped
    let pending = tokio::time::timeout(Duration::from_millis(100), driver.set_torch(true)).await;
    assert!(pending.is_err());
    assert_eq!(device.opened_tracks(), 1);
    assert_eq!(device.active_tracks(), 0);

    // The session holds nothing and turning off does not wait
    assert!(!driver.is_live().await);
    assert!(driver.set_torch(false).await);
    assert!(device.writes().is_empty());
    assert_eq!(driver.stats().await.acquisitions, 0);
}

#[tokio::test]
async fn test_torch_applied_only_for_hardware_writes() {
    let device = SimulatedCaptureDevice::new();
    let events = EventBus::new(16);
    let mut receiver = events.subscribe();
    let driver = TorchDriver::new(
        session_for(&device),
        ErrorSlot::new(events.clone()),
        events,
    );

    // No track held: nothing reaches the hardware
    assert!(driver.set_torch(false).await);
    assert!(driver.set_torch(true).await);
    // Redundant
    assert!(driver.set_torch(true).await);
    assert!(driver.set_torch(false).await);

    let mut applied = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let crate::events::TorchEvent::TorchApplied { on, .. } = event {
            applied.push(on);
        }
    }
    assert_eq!(applied, vec![true, false]);
    assert_eq!(device.torch_history(), vec![true, false]);
}
