//! Per-frame mouth animation driven by the speaking flag.
//!
//! The animator has two states.  While [`MouthState::Articulating`] each
//! frame advances a phase accumulator by `delta * mouth_speed` and the mouth
//! openness is `|sin(phase)| * max_open`.  While [`MouthState::Closed`] the
//! openness is exactly `0.0`; the phase is kept so the next utterance picks
//! up where the last one stopped.

use std::f64::consts::TAU;

use crate::config::AvatarConfig;
use crate::tts::SpeakingState;

/// Capability the rendering host hands to the animator: set a named
/// facial-expression weight in `[0, 1]`.
pub trait ExpressionTarget {
    fn set_expression(&mut self, name: &str, weight: f32);
}

/// Logical state of the mouth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouthState {
    Closed,
    Articulating,
}

/// Drives the mouth-open expression from a [`SpeakingState`].
#[derive(Debug)]
pub struct ExpressionAnimator {
    speaking: SpeakingState,
    expression: String,
    mouth_speed: f64,
    max_open: f32,
    /// Always kept in `[0, TAU)`.
    phase: f64,
    state: MouthState,
    openness: f32,
}

impl ExpressionAnimator {
    pub fn new(speaking: SpeakingState, config: &AvatarConfig) -> Self {
        let mouth_speed = if config.mouth_speed.is_finite() {
            config.mouth_speed.abs()
        } else {
            0.0
        };
        let max_open = if config.max_open.is_finite() {
            config.max_open.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            speaking,
            expression: config.expression.clone(),
            mouth_speed: f64::from(mouth_speed),
            max_open,
            phase: 0.0,
            state: MouthState::Closed,
            openness: 0.0,
        }
    }

    /// Read the speaking flag, advance by `delta` seconds and write the
    /// result to `target`.  Returns the openness that was written.
    pub fn update(&mut self, delta: f32, target: &mut dyn ExpressionTarget) -> f32 {
        let speaking = self.speaking.is_speaking();
        let openness = self.step(speaking, delta);
        target.set_expression(&self.expression, openness);
        log::trace!("{} = {openness:.3}", self.expression);
        openness
    }

    /// Advance the state machine without touching a target.
    ///
    /// Negative or non-finite deltas are treated as zero.
    pub fn step(&mut self, speaking: bool, delta: f32) -> f32 {
        let next = if speaking {
            MouthState::Articulating
        } else {
            MouthState::Closed
        };
        if next != self.state {
            log::debug!("mouth {:?} -> {next:?}", self.state);
            self.state = next;
        }

        match self.state {
            MouthState::Closed => {
                self.openness = 0.0;
            }
            MouthState::Articulating => {
                let delta = if delta.is_finite() && delta > 0.0 {
                    f64::from(delta)
                } else {
                    0.0
                };
                self.phase = (self.phase + delta * self.mouth_speed).rem_euclid(TAU);
                self.openness = (self.phase.sin().abs() as f32 * self.max_open).min(self.max_open);
            }
        }
        self.openness
    }

    pub fn state(&self) -> MouthState {
        self.state
    }

    /// Openness written by the last frame.
    pub fn openness(&self) -> f32 {
        self.openness
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn max_open(&self) -> f32 {
        self.max_open
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
