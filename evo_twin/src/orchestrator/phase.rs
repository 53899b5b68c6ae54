//! Move pipeline phases.
//!
//! Idle → Predicting → Validating → Executing → Resolving → Idle.
//! `Abort` returns to Idle from Predicting or Validating only; once a move is
//! executing it always runs through Resolving.

use serde::{Deserialize, Serialize};

/// Pipeline phase of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepPhase {
    /// No move in progress.
    #[default]
    Idle,
    /// Danger-zone prediction.
    Predicting,
    /// IK, limit clamping, feed limiting, timing.
    Validating,
    /// Motion executor running.
    Executing,
    /// Collision query and constraint solve.
    Resolving,
}

/// Event that can trigger a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Move accepted.
    Start,
    /// Prediction finished.
    Validate,
    /// Validation finished.
    Execute,
    /// Executor returned.
    Resolve,
    /// Results folded into the step.
    Complete,
    /// Move cancelled before execution.
    Abort,
}

/// Result of a phase transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded: new phase.
    Ok(StepPhase),
    /// Transition rejected: reason.
    Rejected(&'static str),
}

/// Phase holder for one machine.
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    phase: StepPhase,
}

impl PhaseMachine {
    /// Start in Idle.
    pub const fn new() -> Self {
        Self {
            phase: StepPhase::Idle,
        }
    }

    /// Current phase.
    #[inline]
    pub const fn phase(&self) -> StepPhase {
        self.phase
    }

    /// True while a move is in progress.
    #[inline]
    pub const fn is_running(&self) -> bool {
        !matches!(self.phase, StepPhase::Idle)
    }

    /// Attempt a transition.
    pub fn handle_event(&mut self, event: PhaseEvent) -> TransitionResult {
        use PhaseEvent::*;
        use StepPhase::*;

        let next = match (self.phase, event) {
            (Idle, Start) => Predicting,
            (Predicting, Validate) => Validating,
            (Validating, Execute) => Executing,
            (Executing, Resolve) => Resolving,
            (Resolving, Complete) => Idle,
            (Predicting | Validating, Abort) => Idle,
            _ => return TransitionResult::Rejected(invalid_transition_reason(self.phase, event)),
        };

        self.phase = next;
        TransitionResult::Ok(next)
    }
}

fn invalid_transition_reason(phase: StepPhase, event: PhaseEvent) -> &'static str {
    use PhaseEvent::*;
    use StepPhase::*;
    match (phase, event) {
        (Executing | Resolving, Abort) => "move already executing, abort not allowed",
        (Idle, _) => "Idle: only Start allowed",
        (Predicting, _) => "Predicting: only Validate or Abort allowed",
        (Validating, _) => "Validating: only Execute or Abort allowed",
        (Executing, _) => "Executing: only Resolve allowed",
        (Resolving, _) => "Resolving: only Complete allowed",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
