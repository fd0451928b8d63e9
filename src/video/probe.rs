use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, VideoError};

/// Static metadata of a video file's first video stream
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Declared frame count; derived from duration when the container does
    /// not carry an explicit count
    pub frame_count: u64,
    pub frame_rate: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    duration: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a video file with `ffprobe`
///
/// `fallback_fps` is used when the container reports no usable frame rate
/// (the recording rigs this targets write at a known constant rate, so the
/// pipeline rate stands in).
pub fn probe<P: AsRef<Path>>(path: P, fallback_fps: f64) -> Result<VideoMetadata> {
    let path = path.as_ref();

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoError::Probe {
            path: path.display().to_string(),
            reason: format!("failed to run ffprobe: {e}"),
        })?;

    if !output.status.success() {
        return Err(VideoError::Probe {
            path: path.display().to_string(),
            reason: format!("ffprobe exited with {}", output.status),
        }
        .into());
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let metadata = parse_probe_output(&json, fallback_fps).map_err(|reason| VideoError::Probe {
        path: path.display().to_string(),
        reason,
    })?;

    debug!(
        "Probed {}: {}x{}, {} frames @ {:.2} fps",
        path.display(),
        metadata.width,
        metadata.height,
        metadata.frame_count,
        metadata.frame_rate
    );

    Ok(metadata)
}

/// Interpret ffprobe's JSON for the first video stream
fn parse_probe_output(json: &str, fallback_fps: f64) -> std::result::Result<VideoMetadata, String> {
    let parsed: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("invalid ffprobe output: {e}"))?;

    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let width = stream.width.ok_or_else(|| "stream has no width".to_string())?;
    let height = stream.height.ok_or_else(|| "stream has no height".to_string())?;

    let frame_rate = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational_fps)
        .unwrap_or(fallback_fps);

    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(n) => n,
        None => {
            let duration: f64 = stream
                .duration
                .as_deref()
                .and_then(|d| d.parse().ok())
                .unwrap_or(0.0);
            (duration * frame_rate).round() as u64
        }
    };

    Ok(VideoMetadata {
        width,
        height,
        frame_count,
        frame_rate,
    })
}

/// Parse ffprobe's `num/den` frame-rate notation; `0/0` means unknown
fn parse_rational_fps(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rational_fps() {
        assert_eq!(parse_rational_fps("30/1"), Some(30.0));
        let ntsc = parse_rational_fps("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_rational_fps("0/0"), None);
        assert_eq!(parse_rational_fps("garbage"), None);
    }

    #[test]
    fn test_parse_probe_output_with_explicit_frame_count() {
        let json = r#"{"streams":[{"width":1920,"height":1080,
            "nb_frames":"300","duration":"10.000000","avg_frame_rate":"30/1"}]}"#;
        let m = parse_probe_output(json, 25.0).unwrap();
        assert_eq!((m.width, m.height), (1920, 1080));
        assert_eq!(m.frame_count, 300);
        assert_eq!(m.frame_rate, 30.0);
    }

    #[test]
    fn test_parse_probe_output_derives_count_from_duration() {
        let json = r#"{"streams":[{"width":640,"height":480,
            "duration":"2.5","avg_frame_rate":"30/1"}]}"#;
        let m = parse_probe_output(json, 30.0).unwrap();
        assert_eq!(m.frame_count, 75);
    }

    #[test]
    fn test_parse_probe_output_falls_back_on_unknown_rate() {
        let json = r#"{"streams":[{"width":640,"height":480,
            "nb_frames":"60","avg_frame_rate":"0/0"}]}"#;
        let m = parse_probe_output(json, 30.0).unwrap();
        assert_eq!(m.frame_rate, 30.0);
    }

    #[test]
    fn test_parse_probe_output_rejects_streamless_files() {
        assert!(parse_probe_output(r#"{"streams":[]}"#, 30.0).is_err());
        assert!(parse_probe_output(r#"{}"#, 30.0).is_err());
    }
}
