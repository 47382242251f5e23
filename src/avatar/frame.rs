//! Frame timing for hosts without their own render loop.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::avatar::animator::{ExpressionAnimator, ExpressionTarget};

/// Measures the time between consecutive frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick; `0.0` on the first tick.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        delta
    }
}

/// Period of one frame at `frame_rate` fps.  A rate of zero is treated as 1.
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1)))
}

/// Update `animator` into `target` once per frame until `shutdown` becomes
/// `true` or its sender is dropped.  Returns both so the caller can inspect
/// the final pose.
///
/// Late frames are skipped rather than bunched up; the next frame simply
/// sees a larger delta.
pub async fn run_frame_loop<T>(
    mut animator: ExpressionAnimator,
    mut target: T,
    frame_rate: u32,
    mut shutdown: watch::Receiver<bool>,
) -> (ExpressionAnimator, T)
where
    T: ExpressionTarget + Send,
{
    let mut interval = tokio::time::interval(frame_period(frame_rate));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut clock = FrameClock::new();

    log::debug!("frame loop started at {} fps", frame_rate.max(1));

    loop {
        tokio::select! {
            tick = interval.tick() => {
                let delta = clock.tick(tick.into_std());
                animator.update(delta, &mut target);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    log::debug!("frame loop stopped");
    (animator, target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
