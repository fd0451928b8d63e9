use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::timeline::clip::{secs_between, secs_to_duration, Clip};

/// A contiguous run of frames in the synthesized timeline
///
/// `Real` covers a clip's full frame range; `Filler` bridges the wall-clock
/// gap before the following clip with synthetic black frames.
#[derive(Debug, Clone)]
pub enum Segment {
    Real {
        clip: Clip,
        /// Declared frame count, advisory; emission reads to exhaustion
        frame_count: u64,
    },
    Filler {
        /// Instant of the run's first frame (the predecessor's end time)
        start_time: DateTime<Local>,
        frame_count: u64,
    },
}

impl Segment {
    pub fn frame_count(&self) -> u64 {
        match self {
            Segment::Real { frame_count, .. } => *frame_count,
            Segment::Filler { frame_count, .. } => *frame_count,
        }
    }

    /// Wall-clock instant of frame `index` within this segment
    pub fn frame_timestamp(&self, frame_rate: f64, index: u64) -> DateTime<Local> {
        let base = match self {
            Segment::Real { clip, .. } => clip.recorded_start,
            Segment::Filler { start_time, .. } => *start_time,
        };
        base + secs_to_duration(index as f64 / frame_rate)
    }

    pub fn is_filler(&self) -> bool {
        matches!(self, Segment::Filler { .. })
    }
}

/// Compute the gap-filled segment schedule for a run of clips
///
/// Clips must be sorted by `recorded_start` ascending and `frame_rate` must
/// be positive; both are enforced upstream (the batch driver sorts, the
/// config validates). The first clip gets no leading filler. For each later
/// clip the gap to the predecessor's declared end is bridged with
/// `round(gap * frame_rate)` black frames; a zero or negative gap (clips
/// overlapping in wall-clock time, usually clock skew or recordings faster
/// than real time) inserts nothing and is reported as an anomaly, not an
/// error. The clip's own recorded start stays the base for its frame
/// timestamps regardless of overlap.
pub fn align(clips: &[Clip], frame_rate: f64) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(clips.len() * 2);
    let mut prev_end: Option<DateTime<Local>> = None;

    for clip in clips {
        if let Some(prev_end) = prev_end {
            let gap_seconds = secs_between(prev_end, clip.recorded_start);

            if gap_seconds > 0.0 {
                let filler_frames = (gap_seconds * frame_rate).round() as u64;
                if filler_frames > 0 {
                    debug!(
                        "Gap of {:.3}s before {} -> {} filler frames",
                        gap_seconds,
                        clip.file_name(),
                        filler_frames
                    );
                    segments.push(Segment::Filler {
                        start_time: prev_end,
                        frame_count: filler_frames,
                    });
                }
            } else if gap_seconds < 0.0 {
                warn!(
                    "Clip {} starts {:.3}s before predecessor ends ({} < {}); \
                     no filler inserted, proceeding with the clip's own start time",
                    clip.file_name(),
                    -gap_seconds,
                    clip.recorded_start.format("%Y-%m-%d %H:%M:%S%.3f"),
                    prev_end.format("%Y-%m-%d %H:%M:%S%.3f"),
                );
            }
        }

        segments.push(Segment::Real {
            clip: clip.clone(),
            frame_count: clip.frame_count,
        });

        prev_end = Some(clip.recorded_start + secs_to_duration(clip.frame_count as f64 / frame_rate));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    fn clip(name: &str, start: DateTime<Local>, frames: u64) -> Clip {
        Clip::new(
            format!("{name}.MOV"),
            format!("part_{name}.mp4"),
            start,
            frames,
            30.0,
        )
    }

    #[test]
    fn test_single_clip_has_no_leading_filler() {
        let clips = vec![clip("a", at(0, 0, 0), 300)];
        let segments = align(&clips, 30.0);

        assert_eq!(segments.len(), 1);
        assert!(!segments[0].is_filler());
        assert_eq!(segments[0].frame_count(), 300);
    }

    #[test]
    fn test_gap_produces_rounded_filler_count() {
        // A ends at 00:00:10, B starts at 00:00:12: 2.0s gap at 30 fps
        let clips = vec![clip("a", at(0, 0, 0), 300), clip("b", at(0, 0, 12), 150)];
        let segments = align(&clips, 30.0);

        assert_eq!(segments.len(), 3);
        match &segments[1] {
            Segment::Filler { start_time, frame_count } => {
                assert_eq!(*frame_count, 60);
                assert_eq!(*start_time, at(0, 0, 10));
            }
            other => panic!("expected filler, got {other:?}"),
        }
    }

    #[test]
    fn test_overlap_inserts_no_filler() {
        // B starts well before A's declared end
        let clips = vec![clip("a", at(0, 0, 0), 3000), clip("b", at(0, 0, 10), 150)];
        let segments = align(&clips, 30.0);

        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| !s.is_filler()));
    }

    #[test]
    fn test_contiguous_clips_insert_no_filler() {
        // B starts exactly when A ends
        let clips = vec![clip("a", at(0, 0, 0), 300), clip("b", at(0, 0, 10), 150)];
        let segments = align(&clips, 30.0);

        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| !s.is_filler()));
    }

    #[test]
    fn test_segment_count_bound() {
        let clips = vec![
            clip("a", at(0, 0, 0), 30),
            clip("b", at(0, 0, 10), 30),
            clip("c", at(0, 0, 20), 30),
            clip("d", at(0, 0, 21), 30),
        ];
        let segments = align(&clips, 30.0);
        assert!(segments.len() <= 2 * clips.len() - 1);
    }

    #[test]
    fn test_timestamps_non_decreasing_across_schedule() {
        let clips = vec![
            clip("a", at(0, 0, 0), 90),
            clip("b", at(0, 0, 7), 45),
            clip("c", at(0, 0, 8), 45), // overlaps b's tail
            clip("d", at(0, 1, 0), 45),
        ];
        let segments = align(&clips, 30.0);

        let mut last = None;
        for segment in &segments {
            // Within a segment timestamps advance by construction; checking
            // first and last frames covers the seams.
            let first = segment.frame_timestamp(30.0, 0);
            let end = segment.frame_timestamp(30.0, segment.frame_count().saturating_sub(1));
            assert!(first <= end);
            if let Some(prev_first) = last {
                assert!(first >= prev_first, "segment start went backwards");
            }
            last = Some(first);
        }
    }

    #[test]
    fn test_two_clip_schedule_end_to_end() {
        // A: 300 frames at 00:00:00 (10s), B: 150 frames at 00:00:15 (5s).
        // Expect Real(300), Filler(150) spanning 00:00:10..00:00:15, Real(150).
        let clips = vec![clip("a", at(0, 0, 0), 300), clip("b", at(0, 0, 15), 150)];
        let segments = align(&clips, 30.0);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].frame_count(), 300);
        assert_eq!(segments[1].frame_count(), 150);
        assert_eq!(segments[2].frame_count(), 150);
        assert_eq!(
            segments.iter().map(Segment::frame_count).sum::<u64>(),
            600
        );

        // Real A: frame 0 at 00:00:00, frame 299 at ~00:00:09.967
        assert_eq!(segments[0].frame_timestamp(30.0, 0), at(0, 0, 0));
        let a_last = secs_between(at(0, 0, 0), segments[0].frame_timestamp(30.0, 299));
        assert!((a_last - 299.0 / 30.0).abs() < 1e-6);

        // Filler: frame 0 at 00:00:10, frame 149 at ~00:00:14.967
        assert_eq!(segments[1].frame_timestamp(30.0, 0), at(0, 0, 10));
        let f_last = secs_between(at(0, 0, 0), segments[1].frame_timestamp(30.0, 149));
        assert!((f_last - (10.0 + 149.0 / 30.0)).abs() < 1e-6);

        // Real B: frame 0 at 00:00:15
        assert_eq!(segments[2].frame_timestamp(30.0, 0), at(0, 0, 15));
    }

    #[test]
    fn test_sub_frame_gap_rounds_away() {
        // 0.01s gap at 30 fps rounds to zero filler frames
        let a = clip("a", at(0, 0, 0), 300);
        let b = Clip::new(
            "b.MOV".to_string(),
            "part_b.mp4".to_string(),
            at(0, 0, 10) + chrono::Duration::milliseconds(10),
            150,
            30.0,
        );
        let segments = align(&[a, b], 30.0);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_empty_clip_list_yields_empty_schedule() {
        let segments = align(&[], 30.0);
        assert!(segments.is_empty());
    }
}
