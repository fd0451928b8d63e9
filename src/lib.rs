//! # Clipstitch
//!
//! Stitch timestamped experiment recordings into one continuous video.
//!
//! Recording rigs split long sessions into many short clips with pauses in
//! between. Clipstitch reconstructs the wall-clock timeline from file
//! metadata, bridges the pauses with black filler frames, burns a readable
//! timestamp into every frame, and writes a single output video per
//! experiment.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clipstitch::{config::Config, pipeline::BatchDriver};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let driver = BatchDriver::new(config);
//!
//! let summary = driver.run(
//!     "recordings/".as_ref(),
//!     "recordings/stitched/".as_ref(),
//!     Some("2024"),
//! )?;
//! assert!(summary.all_succeeded());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`timeline`] - Clip records and the gap-filling alignment algorithm
//! - [`video`] - Frame buffers, decode sources, the encoder, stamping
//! - [`pipeline`] - Conversion, concatenation, cleanup, and the batch driver
//! - [`config`] - Configuration management
//!
//! Decoding and encoding are delegated to external `ffmpeg`/`ffprobe`
//! processes; frames cross the process boundary as packed RGB24 rawvideo.
//! The pipeline is deliberately single-threaded: throughput is bounded by
//! the codecs, not by coordination.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod timeline;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{Result, StitchError},
    pipeline::{BatchDriver, ConcatenationPipeline},
    timeline::{align, Clip, Segment},
};
