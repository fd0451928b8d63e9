//! # Video I/O Module
//!
//! Frame buffers, metadata probing, sequential decode sources, the output
//! encoder, and timestamp stamping. Decode and encode go through external
//! `ffmpeg`/`ffprobe` processes speaking rawvideo over pipes.

pub mod encoder;
pub mod probe;
pub mod source;
pub mod stamp;
pub mod types;

pub use encoder::{EncodeSettings, FrameSink, VideoEncoder};
pub use probe::VideoMetadata;
pub use source::{FrameSource, OpenSource, VideoSource, VideoSourceOpener};
pub use stamp::{blank, TimestampStamper};
pub use types::Frame;
