//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, push to the web
//! layer's status socket, etc.

use crate::fsm::{Reason, StateId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged {
        from: StateId,
        to: StateId,
        reason: Reason,
        status: &'static str,
    },

    /// The heater relay was commanded on or off.
    HeaterChanged(bool),

    /// The climate sensor stopped returning valid samples.
    SensorFault,

    /// The climate sensor recovered after a fault.
    SensorRecovered,

    /// A persistence operation failed; the system continues in memory.
    PersistenceFailed(&'static str),
}
