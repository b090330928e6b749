//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap. This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!            ┌──[mode=Dry]───▶ DRYING ──[target met / stalled]──▶ WARMING
//!            │                   ▲                                   │
//!   IDLE ────┼──[mode=Heat]──▶ HEATING ──[timer expired]────────────┤
//!            │                   └──[timer, action=Stop]──▶ IDLE    │
//!            └──[mode=Warm]──────────────────────────────▶ WARMING  │
//!                                                                   │
//!                DRYING ◀──[humidity > setpoint + hysteresis]───────┘
//!                            (only when entered from Drying)
//!
//!   enable=false ──▶ IDLE  (forced, any state)
//! ```

use super::context::DryerContext;
use super::{Reason, StateDescriptor, StateId, Transition};
use crate::config::{DryerMode, HeatCompletion};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — Drying
        StateDescriptor {
            id: StateId::Drying,
            name: "Drying",
            on_enter: Some(drying_enter),
            on_exit: None,
            on_update: drying_update,
        },
        // Index 2 — Heating
        StateDescriptor {
            id: StateId::Heating,
            name: "Heating",
            on_enter: Some(heating_enter),
            on_exit: None,
            on_update: heating_update,
        },
        // Index 3 — Warming
        StateDescriptor {
            id: StateId::Warming,
            name: "Warming",
            on_enter: Some(warming_enter),
            on_exit: None,
            on_update: warming_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state — heater disabled, waiting for the user
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut DryerContext) {
    // A run ends here: the next Drying entry starts fresh.
    ctx.dry_run_active = false;
    ctx.warming_can_redry = false;
    info!("IDLE: process stopped, no heat demand");
}

fn idle_update(ctx: &mut DryerContext) -> Option<Transition> {
    if !ctx.enabled {
        return None;
    }

    // User enabled the dryer: enter the mode-specific start state.
    Some(Transition::new(
        mode_start_state(ctx.config.mode),
        Reason::UserAction,
    ))
}

/// Entry state for each operating mode.
pub fn mode_start_state(mode: DryerMode) -> StateId {
    match mode {
        DryerMode::Dry => StateId::Drying,
        DryerMode::Heat => StateId::Heating,
        DryerMode::Warm => StateId::Warming,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  DRYING state — pursuing the humidity target at the drying temperature
// ═══════════════════════════════════════════════════════════════════════════

fn drying_enter(ctx: &mut DryerContext) {
    // Re-arm the stall window on every entry (fresh run or re-dry). With
    // no valid sample the snapshot stays empty and the first valid
    // reading arms it instead; a fabricated 0.0 would make every real
    // drop look negative and flag a progressing run as stalled.
    ctx.last_stall_check_ms = ctx.now_ms;
    ctx.humidity_at_stall_check = ctx.humidity();

    // The effective setpoint initializes once per run, so a stall
    // override survives a hysteresis re-entry.
    if !ctx.dry_run_active {
        ctx.effective_setpoint = ctx.config.setpoint_humidity;
        ctx.dry_run_active = true;
    }
    info!(
        "DRYING: target {:.1}%RH at {:.1}C, stall window {}ms",
        ctx.effective_setpoint, ctx.config.drying_temp_c, ctx.config.stall_check_interval_ms
    );
}

fn drying_update(ctx: &mut DryerContext) -> Option<Transition> {
    // No valid sample: hold position. An invalid reading must never look
    // like a reached target or a stalled run.
    let humidity = ctx.humidity()?;

    // Target met. The humidity > 0 guard rejects an all-zero reading from
    // a faulted sensor front-end.
    if humidity <= ctx.effective_setpoint && humidity > 0.0 {
        info!(
            "DRYING: setpoint reached ({:.1}%RH <= {:.1}%RH)",
            humidity, ctx.effective_setpoint
        );
        ctx.warming_can_redry = true;
        return Some(Transition::new(StateId::Warming, Reason::TargetMet));
    }

    // The stall window arms from the first valid reading of this entry.
    let Some(snapshot) = ctx.humidity_at_stall_check else {
        ctx.last_stall_check_ms = ctx.now_ms;
        ctx.humidity_at_stall_check = Some(humidity);
        return None;
    };

    // Stall evaluation once the window has elapsed.
    if ctx.stall_window_elapsed_ms() > ctx.config.stall_check_interval_ms {
        let drop = snapshot - humidity;
        if drop < ctx.config.stall_humidity_delta {
            info!(
                "DRYING: stalled ({:.2}%RH drop over {}ms), holding at {:.1}%RH",
                drop, ctx.config.stall_check_interval_ms, humidity
            );
            // The stalled level becomes the new working target.
            ctx.effective_setpoint = humidity;
            ctx.warming_can_redry = true;
            return Some(Transition::new(StateId::Warming, Reason::Stalled));
        }
        // Progress continues: re-arm the window.
        ctx.last_stall_check_ms = ctx.now_ms;
        ctx.humidity_at_stall_check = Some(humidity);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HEATING state — fixed-duration heat at the drying temperature
// ═══════════════════════════════════════════════════════════════════════════

fn heating_enter(ctx: &mut DryerContext) {
    ctx.heat_start_ms = ctx.now_ms;
    info!(
        "HEATING: {:.1}C for {}ms, then {:?}",
        ctx.config.drying_temp_c, ctx.config.heat_duration_ms, ctx.config.heat_completion
    );
}

fn heating_update(ctx: &mut DryerContext) -> Option<Transition> {
    if ctx.heat_elapsed_ms() <= ctx.config.heat_duration_ms {
        return None;
    }

    match ctx.config.heat_completion {
        HeatCompletion::Stop => {
            info!("HEATING: duration elapsed, stopping");
            ctx.enabled = false;
            Some(Transition::new(StateId::Idle, Reason::TimerExpired))
        }
        HeatCompletion::Warm => {
            info!("HEATING: duration elapsed, holding warm");
            // Time-expired warming never re-arms into Drying.
            ctx.warming_can_redry = false;
            Some(Transition::new(StateId::Warming, Reason::TimerExpired))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  WARMING state — holding at the warm temperature
// ═══════════════════════════════════════════════════════════════════════════

fn warming_enter(ctx: &mut DryerContext) {
    info!(
        "WARMING: holding {:.1}C (re-dry armed: {})",
        ctx.config.warm_temp_c, ctx.warming_can_redry
    );
}

fn warming_update(ctx: &mut DryerContext) -> Option<Transition> {
    // Only a Warming state entered from Drying in this run may resume.
    if !ctx.warming_can_redry {
        return None;
    }
    let humidity = ctx.humidity()?;

    if humidity > ctx.effective_setpoint + ctx.config.humidity_hysteresis {
        info!(
            "WARMING: humidity crept to {:.1}%RH (> {:.1} + {:.1}), resuming drying",
            humidity, ctx.effective_setpoint, ctx.config.humidity_hysteresis
        );
        return Some(Transition::new(StateId::Drying, Reason::Hysteresis));
    }

    None
}
