use super::detector::ShakeDetector;
use super::source::MotionSource;
use crate::config::TriggerConfig;
use crate::control::{ControlRequest, ControlSender, TriggerSource};
use crate::error::{CaptureError, Result, TorchError};
use crate::events::{EventBus, TorchEvent};
use crate::status::ErrorSlot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct PollTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Watches the accelerometer while enabled and asks the controller to flip
/// activity when the device is shaken.
pub struct MotionTriggerMonitor {
    source: Arc<dyn MotionSource>,
    config: TriggerConfig,
    control: ControlSender,
    events: EventBus,
    errors: ErrorSlot,
    enabled: Arc<AtomicBool>,
    task: Mutex<Option<PollTask>>,
}

impl MotionTriggerMonitor {
    pub fn new(
        source: Arc<dyn MotionSource>,
        config: &TriggerConfig,
        control: ControlSender,
        events: EventBus,
        errors: ErrorSlot,
    ) -> Self {
        Self {
            source,
            config: config.clone(),
            control,
            events,
            errors,
            enabled: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Request sensor access and start polling. A declined request leaves
    /// the monitor disabled and is reported to the error slot.
    pub async fn enable(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("Motion trigger already enabled");
            return Ok(());
        }

        if let Err(e) = self.source.request_permission().await {
            let error = classify(self.source.name(), e);
            warn!("Motion trigger disabled: {}", error);
            self.enabled.store(false, Ordering::SeqCst);
            self.errors.report(&error);
            return Err(error);
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.source),
            ShakeDetector::new(&self.config),
            self.config.motion_poll(),
            self.control.clone(),
            self.events.clone(),
            token.clone(),
        ));
        *task = Some(PollTask { token, handle });
        self.enabled.store(true, Ordering::SeqCst);
        info!("Motion trigger enabled on {}", self.source.name());
        Ok(())
    }

    pub async fn disable(&self) {
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        self.enabled.store(false, Ordering::SeqCst);
        task.token.cancel();
        if let Err(e) = task.handle.await {
            warn!("Motion poll task ended abnormally: {}", e);
        }
        info!("Motion trigger disabled");
    }

    /// Flip the trigger, returning whether it is now enabled
    pub async fn toggle(&self) -> Result<bool> {
        if self.is_enabled() {
            self.disable().await;
            Ok(false)
        } else {
            self.enable().await.map(|_| true)
        }
    }
}

fn classify(source: &str, error: CaptureError) -> TorchError {
    match error {
        CaptureError::NotAllowed { device } => TorchError::PermissionDenied { device },
        other => TorchError::HardwareUnavailable {
            details: format!("{}: {}", source, other),
        },
    }
}

async fn poll_loop(
    source: Arc<dyn MotionSource>,
    mut detector: ShakeDetector,
    period: Duration,
    control: ControlSender,
    events: EventBus,
    token: CancellationToken,
) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut failing = false;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let sample = match source.read().await {
            Ok(sample) => {
                failing = false;
                sample
            }
            Err(e) => {
                if !failing {
                    warn!("Accelerometer read failed: {}", e);
                    failing = true;
                }
                continue;
            }
        };

        if let Some(magnitude) = detector.check(sample, Instant::now()) {
            info!("Shake detected ({:.1} m/s^2)", magnitude);
            events.emit(TorchEvent::ShakeDetected {
                magnitude,
                timestamp: SystemTime::now(),
            });
            let request = ControlRequest::ToggleActivity {
                source: TriggerSource::Shake,
            };
            if control.send(request).is_err() {
                debug!("Controller is gone, stopping motion poll");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TorchlightConfig;
    use crate::control::{control_channel, ControlReceiver};
    use crate::error::ErrorCategory;
    use crate::motion::ScriptedMotionSource;
    use tokio::time::sleep;

    fn monitor_for(source: &ScriptedMotionSource) -> (MotionTriggerMonitor, ControlReceiver, ErrorSlot) {
        let config = TorchlightConfig::default();
        let events = EventBus::new(64);
        let errors = ErrorSlot::new(events.clone());
        let (control, rx) = control_channel();
        let monitor = MotionTriggerMonitor::new(
            Arc::new(source.clone()),
            &config.triggers,
            control,
            events,
            errors.clone(),
        );
        (monitor, rx, errors)
    }

    #[tokio::test(start_paused = true)]
    async fn test_shake_requests_toggle_once_per_rearm() {
        let source = ScriptedMotionSource::new();
        let (monitor, mut rx, _) = monitor_for(&source);
        monitor.enable().await.unwrap();
        assert!(monitor.is_enabled());

        // Ten violent samples in a row count once
        for _ in 0..10 {
            source.push_shake(30.0);
        }
        sleep(Duration::from_millis(500)).await;
        assert_eq!(
            rx.try_recv().unwrap(),
            ControlRequest::ToggleActivity {
                source: TriggerSource::Shake
            }
        );
        assert!(rx.try_recv().is_err());

        sleep(Duration::from_millis(1000)).await;
        source.push_shake(30.0);
        sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gentle_motion_is_ignored() {
        let source = ScriptedMotionSource::new();
        let (monitor, mut rx, _) = monitor_for(&source);
        monitor.enable().await.unwrap();

        source.push_shake(17.9);
        sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
        assert!(source.read_count() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_permission_auto_disables() {
        let source = ScriptedMotionSource::denied();
        let (monitor, _rx, errors) = monitor_for(&source);

        let err = monitor.enable().await.unwrap_err();
        assert!(matches!(err, TorchError::PermissionDenied { .. }));
        assert!(!monitor.is_enabled());
        assert_eq!(errors.category(), Some(ErrorCategory::PermissionDenied));
        assert_eq!(source.permission_requests(), 1);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(source.read_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_stops_polling() {
        let source = ScriptedMotionSource::new();
        let (monitor, mut rx, _) = monitor_for(&source);

        assert!(monitor.toggle().await.unwrap());
        sleep(Duration::from_millis(100)).await;
        assert!(!monitor.toggle().await.unwrap());

        let reads = source.read_count();
        source.push_shake(40.0);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.read_count(), reads);
        assert!(rx.try_recv().is_err());

        // Disabling twice is harmless
        monitor.disable().await;
    }
}
