//! # Timeline Module
//!
//! Wall-clock reconstruction: clip metadata in, a gap-filled schedule of
//! segments out.

pub mod aligner;
pub mod clip;

pub use aligner::{align, Segment};
pub use clip::Clip;
