//! # Pipeline Module
//!
//! Per-experiment stages (conversion, concatenation, cleanup) and the batch
//! driver that runs them over a directory of experiments.

pub mod batch;
pub mod cleanup;
pub mod concat;
pub mod convert;

pub use batch::{BatchDriver, BatchSummary, ExperimentStatus};
pub use cleanup::CleanupStage;
pub use concat::{ConcatenationPipeline, PipelineReport};
pub use convert::ConversionStage;
