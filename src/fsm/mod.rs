//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌─────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ StateId │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├─────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Idle    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Drying  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Heating │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Warming │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  └─────────┴───────────┴──────────┴───────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state. If it
//! returns `Some(Transition)`, the engine runs `on_exit` for the current
//! state, then `on_enter` for the next, updates the current pointer, and
//! records the transition reason in the context. All functions receive
//! `&mut DryerContext`, which holds the climate sample, configuration,
//! run bookkeeping, and the wall clock.

pub mod context;
pub mod states;
pub mod status;

use context::DryerContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all drying-process states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Drying = 1,
    Heating = 2,
    Warming = 3,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert a `u8` index back to `StateId`. Panics on out-of-range in
    /// debug builds; returns `Idle` in release (safe fallback: no heat
    /// demand).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Drying,
            2 => Self::Heating,
            3 => Self::Warming,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transition reasons
// ---------------------------------------------------------------------------

/// Why the most recent state change happened. Consumed by the status-text
/// derivation and the process log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// No transition has occurred yet.
    None,
    /// Enable toggle, mode change, or initial start.
    UserAction,
    /// Drying reached the effective humidity setpoint.
    TargetMet,
    /// Drying made insufficient progress over the stall window.
    Stalled,
    /// The timed heat phase elapsed.
    TimerExpired,
    /// Humidity rose back past the warming tolerance band.
    Hysteresis,
}

/// A requested state change, carrying the destination and its reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: StateId,
    pub reason: Reason,
}

impl Transition {
    pub const fn new(to: StateId, reason: Reason) -> Self {
        Self { to, reason }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut DryerContext);

/// Signature for the per-tick update handler.
/// Returns `Some(transition)` to move, or `None` to stay.
pub type StateUpdateFn = fn(&mut DryerContext) -> Option<Transition>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]) and tracks the last
/// transition reason alongside the current state pointer.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Reason for the most recent transition.
    last_reason: Reason,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            last_reason: Reason::None,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut DryerContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(transition)`, execute it:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    ///
    /// Returns the transition that was taken, if any.
    pub fn tick(&mut self, ctx: &mut DryerContext) -> Option<Transition> {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(transition) = next {
            self.transition(transition, ctx);
        }
        next
    }

    /// Force an immediate transition, bypassing `on_update`. Used by the
    /// enable switch and by externally commanded mode changes.
    ///
    /// Returns the transition when the state actually changed.
    pub fn force_transition(
        &mut self,
        to: StateId,
        reason: Reason,
        ctx: &mut DryerContext,
    ) -> Option<Transition> {
        if to as usize == self.current {
            return None;
        }
        let transition = Transition::new(to, reason);
        self.transition(transition, ctx);
        Some(transition)
    }

    /// Re-run the current state's exit/enter pair without changing the
    /// state pointer. Used when an external command restarts the active
    /// phase with fresh parameters (mode re-selection, preset load).
    pub fn reenter(&mut self, reason: Reason, ctx: &mut DryerContext) {
        self.transition(Transition::new(self.current_state(), reason), ctx);
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// Reason for the most recent state change.
    pub fn last_reason(&self) -> Reason {
        self.last_reason
    }

    /// Deterministic status text for the current (state, mode, reason).
    pub fn status_text(&self, ctx: &DryerContext) -> &'static str {
        status::status_text(self.current_state(), ctx.config.mode, self.last_reason)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, transition: Transition, ctx: &mut DryerContext) {
        let next_idx = transition.to as usize;

        info!(
            "FSM transition: {} -> {} ({:?})",
            self.table[self.current].name, self.table[next_idx].name, transition.reason
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and bookkeeping
        self.current = next_idx;
        self.last_reason = transition.reason;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
