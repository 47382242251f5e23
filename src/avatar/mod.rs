//! Avatar expression animation.
//!
//! The rendering host calls [`ExpressionAnimator::update`] once per frame
//! with the elapsed time; the animator reads the speaking flag and writes the
//! mouth-open weight through an [`ExpressionTarget`].  Hosts without a render
//! loop of their own can use [`run_frame_loop`].

pub mod animator;
pub mod frame;

pub use animator::{ExpressionAnimator, ExpressionTarget, MouthState};
pub use frame::{frame_period, run_frame_loop, FrameClock};
