use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Duration, Local};

/// One raw recorded video segment with a derived start time
///
/// The recorded start is taken from the raw file's modification time, which
/// the recording workflow leaves as the instant the recording began. The
/// declared frame count comes from probing the intermediate and is advisory:
/// it drives duration and gap math, while emission reads each source to
/// actual exhaustion.
#[derive(Debug, Clone)]
pub struct Clip {
    /// Path to the raw recording (clip identity)
    pub path: PathBuf,

    /// Path to the per-clip intermediate consumed by the pipeline
    pub part_path: PathBuf,

    /// Wall-clock instant the recording started
    pub recorded_start: DateTime<Local>,

    /// Declared frame count of the intermediate
    pub frame_count: u64,

    /// Pipeline frame rate in Hz, constant per run
    pub frame_rate: f64,
}

impl Clip {
    pub fn new<P: Into<PathBuf>>(
        path: P,
        part_path: P,
        recorded_start: DateTime<Local>,
        frame_count: u64,
        frame_rate: f64,
    ) -> Self {
        Self {
            path: path.into(),
            part_path: part_path.into(),
            recorded_start,
            frame_count,
            frame_rate,
        }
    }

    /// Construct with a start time taken from a filesystem timestamp
    pub fn with_mtime<P: Into<PathBuf>>(
        path: P,
        part_path: P,
        mtime: SystemTime,
        frame_count: u64,
        frame_rate: f64,
    ) -> Self {
        Self::new(path, part_path, DateTime::<Local>::from(mtime), frame_count, frame_rate)
    }

    /// Declared duration in seconds (`frame_count / frame_rate`)
    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / self.frame_rate
    }

    /// Wall-clock instant the declared last frame ends
    pub fn recorded_end(&self) -> DateTime<Local> {
        self.recorded_start + secs_to_duration(self.duration_secs())
    }

    /// Wall-clock instant of frame `index` within this clip
    pub fn frame_timestamp(&self, index: u64) -> DateTime<Local> {
        self.recorded_start + secs_to_duration(index as f64 / self.frame_rate)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Convert fractional seconds to a chrono duration at nanosecond precision
pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    Duration::nanoseconds((secs * 1e9).round() as i64)
}

/// Fractional seconds between two instants, `b - a`
pub(crate) fn secs_between(a: DateTime<Local>, b: DateTime<Local>) -> f64 {
    match (b - a).num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        // Over ~292 years; microsecond precision is plenty there
        None => (b - a).num_milliseconds() as f64 / 1e3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_duration_from_declared_frames() {
        let clip = Clip::new("a.MOV", "part_a.mp4", start(), 300, 30.0);
        assert_eq!(clip.duration_secs(), 10.0);
        assert_eq!(secs_between(clip.recorded_start, clip.recorded_end()), 10.0);
    }

    #[test]
    fn test_frame_timestamp_advances_by_frame_interval() {
        let clip = Clip::new("a.MOV", "part_a.mp4", start(), 300, 30.0);
        assert_eq!(clip.frame_timestamp(0), clip.recorded_start);

        let one = secs_between(clip.recorded_start, clip.frame_timestamp(1));
        assert!((one - 1.0 / 30.0).abs() < 1e-9);

        let last = secs_between(clip.recorded_start, clip.frame_timestamp(299));
        assert!((last - 299.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_frames_is_zero_duration() {
        let clip = Clip::new("a.MOV", "part_a.mp4", start(), 0, 30.0);
        assert_eq!(clip.duration_secs(), 0.0);
        assert_eq!(clip.recorded_end(), clip.recorded_start);
    }
}
