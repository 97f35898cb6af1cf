//! Shared fixtures for hardware tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use printscope_communication::{GcodeReply, GcodeTransport};
use printscope_core::{AxisRange, SafetyLimits, TransportError, ZoomOptics};
use printscope_hardware::{
    Hardware, MachineState, SharedStepper, StepDirection, TestBackend, ZoomStepper,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const STEPS_PER_MM: f64 = 80.0;
pub const HOMING_BUDGET: u64 = 8_000;

/// Bounds x,y in [0, 220], z in [0, 250], zoom in [50, 150]
pub fn limits() -> SafetyLimits {
    SafetyLimits {
        x: AxisRange::new(0.0, 220.0),
        y: AxisRange::new(0.0, 220.0),
        z: AxisRange::new(0.0, 250.0),
        zoom: AxisRange::new(50.0, 150.0),
    }
}

/// Focal length 50mm, extent 50..150mm
pub fn optics() -> ZoomOptics {
    ZoomOptics::new(50.0, 50.0, 150.0)
}

pub fn machine() -> Arc<MachineState> {
    Arc::new(MachineState::new(optics()))
}

/// Facade over the test backend
pub fn test_hardware(delay: Duration) -> Arc<Hardware> {
    let machine = machine();
    let backend = TestBackend::with_delay(machine.clone(), delay);
    Arc::new(Hardware::new(
        machine,
        Box::new(backend),
        limits(),
        STEPS_PER_MM,
        HOMING_BUDGET,
    ))
}

/// In-memory G-code transport with canned replies and failures
#[derive(Default)]
pub struct ScriptedTransport {
    open: AtomicBool,
    fail_open: bool,
    sent: Mutex<Vec<String>>,
    unacknowledged: Mutex<Vec<String>>,
    replies: Mutex<Vec<(String, Vec<String>)>>,
    failures: Mutex<Vec<(String, TransportError)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `open` always fails
    pub fn unplugged() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Reply to lines starting with `prefix`; the terminal `ok` is appended
    pub fn reply(&self, prefix: &str, lines: &[&str]) {
        let mut lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        lines.push("ok".to_string());
        self.replies.lock().push((prefix.to_string(), lines));
    }

    /// Fail lines starting with `prefix`
    pub fn fail(&self, prefix: &str, error: TransportError) {
        self.failures.lock().push((prefix.to_string(), error));
    }

    /// Lines sent with an awaited acknowledgment
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Lines sent without waiting
    pub fn unacknowledged(&self) -> Vec<String> {
        self.unacknowledged.lock().clone()
    }
}

#[async_trait]
impl GcodeTransport for ScriptedTransport {
    async fn open(&self) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::FailedToOpen {
                port: "/dev/ttyUSB0".to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_and_await(
        &self,
        line: &str,
        _timeout: Duration,
    ) -> Result<GcodeReply, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(line.to_string());

        if let Some((_, error)) = self
            .failures
            .lock()
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
        {
            return Err(error.clone());
        }

        let lines = self
            .replies
            .lock()
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, lines)| lines.clone())
            .unwrap_or_else(|| vec!["ok".to_string()]);

        Ok(GcodeReply {
            command: line.to_string(),
            lines,
        })
    }

    async fn send_unacknowledged(&self, line: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        self.unacknowledged.lock().push(line.to_string());
        Ok(())
    }
}

/// What a [`RecordingStepper`] has been asked to do
#[derive(Debug, Default)]
pub struct StepLog {
    pub extend_pulses: u64,
    pub retract_pulses: u64,
    pub released: bool,
}

/// Stepper recording pulses; the home switch closes after `switch_after`
/// retract pulses, or never
pub struct RecordingStepper {
    log: Arc<Mutex<StepLog>>,
    direction: StepDirection,
    switch_after: Option<u64>,
}

impl RecordingStepper {
    pub fn shared(switch_after: Option<u64>) -> (SharedStepper, Arc<Mutex<StepLog>>) {
        let log = Arc::new(Mutex::new(StepLog::default()));
        let stepper: Box<dyn ZoomStepper> = Box::new(Self {
            log: log.clone(),
            direction: StepDirection::Extend,
            switch_after,
        });
        (Arc::new(Mutex::new(stepper)), log)
    }
}

impl ZoomStepper for RecordingStepper {
    fn set_direction(&mut self, direction: StepDirection) -> printscope_core::Result<()> {
        self.direction = direction;
        Ok(())
    }

    fn pulse(&mut self) -> printscope_core::Result<()> {
        let mut log = self.log.lock();
        match self.direction {
            StepDirection::Extend => log.extend_pulses += 1,
            StepDirection::Retract => log.retract_pulses += 1,
        }
        Ok(())
    }

    fn home_switch_triggered(&mut self) -> printscope_core::Result<bool> {
        let retracted = self.log.lock().retract_pulses;
        Ok(self.switch_after.is_some_and(|n| retracted >= n))
    }

    fn release(&mut self) {
        self.log.lock().released = true;
    }
}
