use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::types::Frame;

/// Output sink for stamped frames, mockable in tests
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and release the underlying encoder. Consumes the sink; an
    /// unfinished sink is torn down on drop, leaving whatever partial
    /// output the encoder managed to write.
    fn finish(self) -> Result<()>;
}

/// Output encoding parameters derived from config plus the dimensions
/// established from the first opened clip
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub codec: String,
    pub overwrite: bool,
    pub out_path: PathBuf,
}

impl EncodeSettings {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VideoError::InvalidDimensions {
                width: self.width,
                height: self.height,
            }
            .into());
        }
        Ok(())
    }
}

/// Video encoder backed by an external `ffmpeg` process
///
/// Packed RGB24 rawvideo is piped into the child's stdin; the child encodes
/// with the configured codec to yuv420p output. The child is owned
/// exclusively by this encoder and is reaped on `finish` or drop.
pub struct VideoEncoder {
    settings: EncodeSettings,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl VideoEncoder {
    pub fn new(settings: EncodeSettings) -> Result<Self> {
        settings.validate()?;

        if let Some(parent) = settings.out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.arg(if settings.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-v",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", settings.width, settings.height),
            "-r",
            &settings.frame_rate.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            &settings.codec,
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&settings.out_path);

        let mut child = cmd.spawn().map_err(|e| VideoError::EncoderStart {
            reason: format!("failed to spawn ffmpeg: {e}"),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::EncoderStart {
            reason: "ffmpeg stdin unavailable".to_string(),
        })?;

        debug!(
            "Started encoder for {} ({}x{} @ {} fps, {})",
            settings.out_path.display(),
            settings.width,
            settings.height,
            settings.frame_rate,
            settings.codec
        );

        Ok(Self {
            settings,
            child: Some(child),
            stdin: Some(stdin),
        })
    }

    /// Whether the external `ffmpeg` binary is runnable
    pub fn check_ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl FrameSink for VideoEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.settings.width || frame.height() != self.settings.height {
            return Err(VideoError::EncodeWrite {
                reason: format!(
                    "frame size {}x{} does not match encoder {}x{}",
                    frame.width(),
                    frame.height(),
                    self.settings.width,
                    self.settings.height
                ),
            }
            .into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodeWrite {
            reason: "encoder already finished".to_string(),
        })?;

        stdin.write_all(frame.as_raw()).map_err(|e| {
            VideoError::EncodeWrite {
                reason: format!("failed to write frame to ffmpeg stdin: {e}"),
            }
            .into()
        })
    }

    fn finish(mut self) -> Result<()> {
        // Closing stdin signals end of stream and lets the child flush.
        self.stdin.take();

        let child = self.child.take().ok_or_else(|| VideoError::EncodeWrite {
            reason: "encoder already finished".to_string(),
        })?;

        let output = child.wait_with_output().map_err(|e| VideoError::EncodeWrite {
            reason: format!("failed to wait for ffmpeg: {e}"),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::EncodeWrite {
                reason: format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            }
            .into());
        }

        debug!("Encoder finished: {}", self.settings.out_path.display());
        Ok(())
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.wait() {
                warn!(
                    "Failed to reap ffmpeg encoder for {}: {}",
                    self.settings.out_path.display(),
                    e
                );
            }
        }
    }
}

/// Build encoder settings for an output file once dimensions are known
pub fn settings_for_output<P: AsRef<Path>>(
    out_path: P,
    width: u32,
    height: u32,
    frame_rate: f64,
    codec: &str,
    overwrite: bool,
) -> EncodeSettings {
    EncodeSettings {
        width,
        height,
        frame_rate,
        codec: codec.to_string(),
        overwrite,
        out_path: out_path.as_ref().to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation_rejects_zero_dimensions() {
        let settings = settings_for_output("out.mp4", 0, 1080, 30.0, "libx264", true);
        assert!(settings.validate().is_err());

        let settings = settings_for_output("out.mp4", 1920, 0, 30.0, "libx264", true);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_validation_accepts_sane_values() {
        let settings = settings_for_output("out.mp4", 1920, 1080, 30.0, "libx264", true);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.out_path, PathBuf::from("out.mp4"));
    }
}
