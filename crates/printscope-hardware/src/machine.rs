//! Shared machine state
//!
//! Position, zoom and status are written by the single command executor and
//! read concurrently by telemetry. Every read copies the whole value out, so
//! a reader never observes a half-updated position.
//!
//! The emergency-stop flag is an atomic shared with long-running loops and
//! the serial transport; raising it never waits on any lock held by the
//! executor.

use chrono::Utc;
use parking_lot::RwLock;
use printscope_core::{
    EventDispatcher, MachineEvent, Position, SystemStatus, TelemetryData, ZoomOptics, ZoomState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Machine state shared by the facade, the backend and the dispatcher
pub struct MachineState {
    position: RwLock<Position>,
    zoom: RwLock<ZoomState>,
    status: RwLock<SystemStatus>,
    last_error: RwLock<Option<String>>,
    emergency: Arc<AtomicBool>,
    optics: ZoomOptics,
    events: EventDispatcher,
}

impl MachineState {
    /// Fresh state: nozzle at the origin, zoom unhomed at its minimum extent
    pub fn new(optics: ZoomOptics) -> Self {
        Self::with_events(optics, EventDispatcher::default())
    }

    /// Fresh state publishing to an existing event dispatcher
    pub fn with_events(optics: ZoomOptics, events: EventDispatcher) -> Self {
        Self {
            position: RwLock::new(Position::ORIGIN),
            zoom: RwLock::new(ZoomState::unhomed(&optics)),
            status: RwLock::new(SystemStatus::Idle),
            last_error: RwLock::new(None),
            emergency: Arc::new(AtomicBool::new(false)),
            optics,
            events,
        }
    }

    /// Zoom optics
    pub fn optics(&self) -> &ZoomOptics {
        &self.optics
    }

    /// Event dispatcher
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Nozzle position snapshot
    pub fn position(&self) -> Position {
        *self.position.read()
    }

    /// Replace the nozzle position
    pub fn set_position(&self, position: Position) {
        *self.position.write() = position;
    }

    /// Zoom snapshot
    pub fn zoom(&self) -> ZoomState {
        *self.zoom.read()
    }

    /// Move the zoom extent, recomputing magnification and percentage
    pub fn set_zoom_distance(&self, distance_mm: f64) {
        self.zoom.write().set_distance(distance_mm, &self.optics);
    }

    /// Flag the zoom actuator as moving or at rest
    pub fn set_zoom_moving(&self, moving: bool) {
        self.zoom.write().is_moving = moving;
    }

    /// Record a completed zoom homing cycle
    pub fn mark_zoom_homed(&self) {
        let mut zoom = self.zoom.write();
        *zoom = ZoomState::at(self.optics.min_extent_mm, &self.optics, true);
    }

    /// Forget the zoom reference after a failed homing cycle
    pub fn mark_zoom_unhomed(&self) {
        self.zoom.write().is_homed = false;
    }

    /// Current status
    pub fn status(&self) -> SystemStatus {
        *self.status.read()
    }

    /// Change the status
    ///
    /// Returns `false` when the change was refused: while the emergency stop
    /// is latched only [`clear_emergency`](Self::clear_emergency) leaves
    /// [`SystemStatus::EmergencyStop`].
    pub fn set_status(&self, status: SystemStatus) -> bool {
        let mut current = self.status.write();
        if status != SystemStatus::EmergencyStop
            && (self.is_emergency_stopped() || *current == SystemStatus::EmergencyStop)
        {
            return false;
        }
        if *current != status {
            *current = status;
            drop(current);
            self.events.publish(MachineEvent::StatusChanged(status));
        }
        true
    }

    /// Last fault message while in the error state
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Enter the error state with `message`
    pub fn record_fault(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
        self.set_status(SystemStatus::Error);
    }

    /// Drop the recorded fault
    pub fn clear_fault(&self) {
        *self.last_error.write() = None;
    }

    /// Shared emergency-stop flag, for loops and transports that poll it
    pub fn emergency_flag(&self) -> Arc<AtomicBool> {
        self.emergency.clone()
    }

    /// Whether the emergency stop is latched
    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency.load(Ordering::SeqCst)
    }

    /// Latch the emergency stop
    ///
    /// Returns `true` if it was not already latched.
    pub fn raise_emergency(&self) -> bool {
        let newly_raised = !self.emergency.swap(true, Ordering::SeqCst);
        self.set_status(SystemStatus::EmergencyStop);
        if newly_raised {
            self.events.publish(MachineEvent::EmergencyStop);
        }
        newly_raised
    }

    /// Release the emergency stop and return to idle
    ///
    /// Returns `true` if it was latched.
    pub fn clear_emergency(&self) -> bool {
        let was_raised = {
            let mut status = self.status.write();
            let was_raised = self.emergency.swap(false, Ordering::SeqCst);
            *status = SystemStatus::Idle;
            was_raised
        };
        self.clear_fault();
        self.events
            .publish(MachineEvent::StatusChanged(SystemStatus::Idle));
        if was_raised {
            self.events.publish(MachineEvent::EmergencyCleared);
        }
        was_raised
    }

    /// Point-in-time telemetry
    pub fn telemetry(&self) -> TelemetryData {
        let status = self.status();
        TelemetryData {
            timestamp: Utc::now(),
            position: self.position(),
            zoom: self.zoom(),
            status,
            error: match status {
                SystemStatus::Error => self.last_error(),
                _ => None,
            },
        }
    }
}
