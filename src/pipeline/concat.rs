use std::path::Path;

use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{PipelineError, Result},
    timeline::{align, Clip, Segment},
    video::{blank, FrameSink, FrameSource, OpenSource, TimestampStamper},
};

/// Frame accounting for one completed concatenation run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub width: u32,
    pub height: u32,
    /// Frames actually decoded and written, across all clips
    pub real_frames: u64,
    /// Synthetic gap-fill frames written
    pub filler_frames: u64,
    /// Clips dropped whole because their source would not open
    pub clips_skipped: usize,
}

impl PipelineReport {
    pub fn total_frames(&self) -> u64 {
        self.real_frames + self.filler_frames
    }
}

/// Streams a gap-filled clip schedule into a single output sink
///
/// Frames flow one at a time in a strict read-stamp-write order; at most one
/// decode source is open at any point. Per-clip decode problems are contained
/// at the clip boundary, while sink failures and dimension mismatches abort
/// the run.
pub struct ConcatenationPipeline<'a> {
    config: &'a Config,
}

impl<'a> ConcatenationPipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run the concatenation for one experiment
    ///
    /// `make_sink` is called with the established output dimensions only
    /// after the first clip has been validated as decodable, so a run that
    /// fails on input produces no output artifact at all.
    pub fn run<O, S, F>(
        &self,
        experiment: &Path,
        clips: &[Clip],
        opener: &O,
        make_sink: F,
    ) -> Result<PipelineReport>
    where
        O: OpenSource,
        S: FrameSink,
        F: FnOnce(u32, u32) -> Result<S>,
    {
        let frame_rate = self.config.video.frame_rate;

        if clips.is_empty() {
            return Err(PipelineError::NoInput {
                path: experiment.display().to_string(),
            }
            .into());
        }

        // Output dimensions come from the first clip; the probe source is
        // closed again before the sink exists, so only one handle is ever
        // open at a time.
        let (width, height) = match opener.open(&clips[0].part_path) {
            Ok(mut source) => {
                let dims = (source.width(), source.height());
                source.close();
                dims
            }
            Err(e) => {
                warn!(
                    "Cannot open first clip {}: {}",
                    clips[0].part_path.display(),
                    e
                );
                return Err(PipelineError::NoInput {
                    path: experiment.display().to_string(),
                }
                .into());
            }
        };

        let segments = align(clips, frame_rate);
        info!(
            "Concatenating {} clips into {} segments at {}x{}",
            clips.len(),
            segments.len(),
            width,
            height
        );

        let mut sink = make_sink(width, height)?;
        let stamper = TimestampStamper::new(&self.config.stamp);

        let mut real_frames = 0u64;
        let mut filler_frames = 0u64;
        let mut clips_skipped = 0usize;

        for segment in &segments {
            match segment {
                Segment::Filler {
                    start_time,
                    frame_count,
                } => {
                    info!(
                        "Filler run: {} frames from {}",
                        frame_count,
                        start_time.format("%Y-%m-%d %H:%M:%S")
                    );
                    for index in 0..*frame_count {
                        let mut frame = blank(width, height)?;
                        stamper.stamp_instant(
                            &mut frame,
                            segment.frame_timestamp(frame_rate, index),
                        );
                        sink.write_frame(&frame)?;
                    }
                    filler_frames += frame_count;
                }
                Segment::Real { clip, frame_count } => {
                    info!(
                        "Clip {}: {} declared frames from {}",
                        clip.file_name(),
                        frame_count,
                        clip.recorded_start.format("%Y-%m-%d %H:%M:%S")
                    );

                    let mut source = match opener.open(&clip.part_path) {
                        Ok(source) => source,
                        Err(e) if e.is_clip_local() => {
                            warn!("Skipping unreadable clip {}: {}", clip.file_name(), e);
                            clips_skipped += 1;
                            continue;
                        }
                        Err(e) => return Err(e),
                    };

                    if (source.width(), source.height()) != (width, height) {
                        let mismatch = PipelineError::DimensionMismatch {
                            path: clip.part_path.display().to_string(),
                            expected_width: width,
                            expected_height: height,
                            actual_width: source.width(),
                            actual_height: source.height(),
                        };
                        source.close();
                        return Err(mismatch.into());
                    }

                    // Declared count drives the gap math only; emission
                    // reads to actual exhaustion.
                    let mut decoded = 0u64;
                    loop {
                        match source.next_frame() {
                            Ok(Some(mut frame)) => {
                                stamper.stamp_instant(
                                    &mut frame,
                                    segment.frame_timestamp(frame_rate, decoded),
                                );
                                if let Err(e) = sink.write_frame(&frame) {
                                    source.close();
                                    return Err(e);
                                }
                                decoded += 1;
                            }
                            Ok(None) => break,
                            Err(e) => {
                                warn!(
                                    "Decode failed in {} after {} frames: {}; \
                                     skipping the remainder of this clip",
                                    clip.file_name(),
                                    decoded,
                                    e
                                );
                                break;
                            }
                        }
                    }
                    source.close();

                    if decoded != *frame_count {
                        debug!(
                            "{}: declared {} frames, decoded {}",
                            clip.file_name(),
                            frame_count,
                            decoded
                        );
                    }
                    real_frames += decoded;
                }
            }
        }

        sink.finish()?;

        let report = PipelineReport {
            width,
            height,
            real_frames,
            filler_frames,
            clips_skipped,
        };
        info!(
            "Concatenation done: {} frames written ({} real, {} filler), {} clips skipped",
            report.total_frames(),
            report.real_frames,
            report.filler_frames,
            report.clips_skipped
        );
        Ok(report)
    }
}
