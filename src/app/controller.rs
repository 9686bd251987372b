use super::backends::Backends;
use super::types::ShutdownReason;
use crate::advisor::LightingAdvisor;
use crate::config::TorchlightConfig;
use crate::control::{control_channel, ControlReceiver, ControlSender};
use crate::events::EventBus;
use crate::hardware::{HardwareSession, TorchDriver};
use crate::keyboard_input::KeyboardInputHandler;
use crate::motion::MotionTriggerMonitor;
use crate::sequencer::ModeSequencer;
use crate::status::ErrorSlot;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Holds activity and mode selection and drives the sequencer and the
/// trigger monitors from user requests
pub struct TorchController {
    pub(super) config: TorchlightConfig,
    pub(super) events: EventBus,
    pub(super) errors: ErrorSlot,
    pub(super) sequencer: ModeSequencer,
    pub(super) motion: MotionTriggerMonitor,
    pub(super) advisor: Arc<dyn LightingAdvisor>,

    pub(super) control_sender: ControlSender,
    pub(super) control_receiver: Option<ControlReceiver>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl TorchController {
    /// Create a controller over the host backends named by `config`
    pub fn new(config: TorchlightConfig) -> Self {
        let backends = Backends::from_config(&config);
        Self::with_backends(config, backends)
    }

    pub fn with_backends(config: TorchlightConfig, backends: Backends) -> Self {
        let events = EventBus::new(config.system.event_bus_capacity);
        let errors = ErrorSlot::new(events.clone());
        let (control_sender, control_receiver) = control_channel();
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let session = HardwareSession::new(backends.capture, &config.hardware);
        let driver = TorchDriver::new(session, errors.clone(), events.clone());
        let sequencer = ModeSequencer::new(
            &config,
            driver,
            backends.amplitude,
            control_sender.clone(),
        );
        let motion = MotionTriggerMonitor::new(
            backends.motion,
            &config.triggers,
            control_sender.clone(),
            events.clone(),
            errors.clone(),
        );
        let keyboard_handler = Some(KeyboardInputHandler::new(
            control_sender.clone(),
            config.sequencer.morse_message.clone(),
        ));

        Self {
            config,
            events,
            errors,
            sequencer,
            motion,
            advisor: backends.advisor,
            control_sender,
            control_receiver: Some(control_receiver),
            keyboard_handler,
            keyboard_enabled: false,
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Enable or disable terminal key control
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    /// Sender for requests handled by `run`
    pub fn control_sender(&self) -> ControlSender {
        self.control_sender.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    pub fn sequencer(&self) -> &ModeSequencer {
        &self.sequencer
    }

    pub fn motion(&self) -> &MotionTriggerMonitor {
        &self.motion
    }

    pub fn config(&self) -> &TorchlightConfig {
        &self.config
    }
}
