//! Status text derivation.
//!
//! A pure function over (state, mode, reason) — no string building, no
//! side effects, so the full derivation table is testable in isolation.
//! The exact strings are part of the external interface: the display and
//! the web layer both show them verbatim.

use super::{Reason, StateId};
use crate::config::DryerMode;

/// Derive the display/status string for the current process state.
pub fn status_text(state: StateId, mode: DryerMode, reason: Reason) -> &'static str {
    match state {
        StateId::Idle => match reason {
            // Heat-mode completion with the Stop action parks here.
            Reason::TimerExpired => "IDLE (Heat Stopped)",
            _ => "IDLE",
        },
        StateId::Drying => match reason {
            Reason::Hysteresis => "Dry / RE-DRYING (Maintaining)",
            _ => "Dry / DRYING",
        },
        StateId::Heating => "Heat / HEATING",
        StateId::Warming => match (mode, reason) {
            (DryerMode::Dry, Reason::Stalled) => "Dry / WARMING (Stalled)",
            (DryerMode::Dry, _) => "Dry / WARMING (Setpoint Reached)",
            (DryerMode::Heat, _) => "Heat / WARMING (Time Expired)",
            (DryerMode::Warm, _) => "Warm / WARMING",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_status_table() {
        let cases = [
            (StateId::Idle, DryerMode::Dry, Reason::None, "IDLE"),
            (StateId::Idle, DryerMode::Dry, Reason::UserAction, "IDLE"),
            (
                StateId::Idle,
                DryerMode::Heat,
                Reason::TimerExpired,
                "IDLE (Heat Stopped)",
            ),
            (
                StateId::Drying,
                DryerMode::Dry,
                Reason::UserAction,
                "Dry / DRYING",
            ),
            (
                StateId::Drying,
                DryerMode::Dry,
                Reason::Hysteresis,
                "Dry / RE-DRYING (Maintaining)",
            ),
            (
                StateId::Warming,
                DryerMode::Dry,
                Reason::TargetMet,
                "Dry / WARMING (Setpoint Reached)",
            ),
            (
                StateId::Warming,
                DryerMode::Dry,
                Reason::Stalled,
                "Dry / WARMING (Stalled)",
            ),
            (
                StateId::Heating,
                DryerMode::Heat,
                Reason::UserAction,
                "Heat / HEATING",
            ),
            (
                StateId::Warming,
                DryerMode::Heat,
                Reason::TimerExpired,
                "Heat / WARMING (Time Expired)",
            ),
            (
                StateId::Warming,
                DryerMode::Warm,
                Reason::UserAction,
                "Warm / WARMING",
            ),
        ];
        for (state, mode, reason, expected) in cases {
            assert_eq!(
                status_text(state, mode, reason),
                expected,
                "({state:?}, {mode:?}, {reason:?})"
            );
        }
    }

    #[test]
    fn derivation_is_total() {
        // Every combination yields some string — no panic, no empty text.
        for state in [
            StateId::Idle,
            StateId::Drying,
            StateId::Heating,
            StateId::Warming,
        ] {
            for mode in [DryerMode::Dry, DryerMode::Heat, DryerMode::Warm] {
                for reason in [
                    Reason::None,
                    Reason::UserAction,
                    Reason::TargetMet,
                    Reason::Stalled,
                    Reason::TimerExpired,
                    Reason::Hysteresis,
                ] {
                    assert!(!status_text(state, mode, reason).is_empty());
                }
            }
        }
    }
}
