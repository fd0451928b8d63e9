use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::probe;
use crate::video::types::Frame;

/// A finite, sequential stream of decoded frames
///
/// Lazy and non-restartable: once exhausted or closed, the file must be
/// opened again to re-read. `close` is idempotent and always safe to call.
pub trait FrameSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Next decoded frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn close(&mut self);
}

/// Factory seam for opening frame sources, mockable in tests
pub trait OpenSource {
    type Source: FrameSource;

    fn open(&self, path: &Path) -> Result<Self::Source>;
}

/// Frame source backed by an external `ffmpeg` decode process
///
/// The child writes packed RGB24 rawvideo to its stdout; one frame is one
/// `width * height * 3` read. The child process is owned exclusively by this
/// source and is reaped on `close` or drop, whichever comes first.
pub struct VideoSource {
    path: String,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl VideoSource {
    pub fn open<P: AsRef<Path>>(path: P, fallback_fps: f64) -> Result<Self> {
        let path = path.as_ref();

        let metadata = probe::probe(path, fallback_fps).map_err(|e| VideoError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::Open {
                path: path.display().to_string(),
                reason: format!("failed to spawn ffmpeg: {e}"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::Open {
            path: path.display().to_string(),
            reason: "ffmpeg stdout unavailable".to_string(),
        })?;

        debug!(
            "Opened decode source {} ({}x{})",
            path.display(),
            metadata.width,
            metadata.height
        );

        Ok(Self {
            path: path.display().to_string(),
            width: metadata.width,
            height: metadata.height,
            child: Some(child),
            stdout: Some(stdout),
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl FrameSource for VideoSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame_len = self.frame_len();
        let stdout = match self.stdout.as_mut() {
            Some(stdout) => stdout,
            // Closed or exhausted
            None => return Ok(None),
        };

        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;

        while filled < buf.len() {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(VideoError::Decode {
                        path: self.path.clone(),
                        reason: e.to_string(),
                    }
                    .into())
                }
            }
        }

        if filled == 0 {
            self.close();
            return Ok(None);
        }

        if filled < buf.len() {
            return Err(VideoError::Decode {
                path: self.path.clone(),
                reason: format!("truncated frame: {filled} of {} bytes", buf.len()),
            }
            .into());
        }

        let frame = Frame::from_rgb_bytes(self.width, self.height, buf).ok_or_else(|| {
            VideoError::Decode {
                path: self.path.clone(),
                reason: "frame buffer size mismatch".to_string(),
            }
        })?;

        Ok(Some(frame))
    }

    fn close(&mut self) {
        // Drop the pipe before reaping so the child sees EPIPE instead of
        // blocking on a full pipe.
        self.stdout.take();

        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => {
                    let _ = child.kill();
                    if let Err(e) = child.wait() {
                        warn!("Failed to reap ffmpeg decoder for {}: {}", self.path, e);
                    }
                }
            }
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens [`VideoSource`]s for the concatenation pipeline
pub struct VideoSourceOpener {
    pub fallback_fps: f64,
}

impl OpenSource for VideoSourceOpener {
    type Source = VideoSource;

    fn open(&self, path: &Path) -> Result<VideoSource> {
        VideoSource::open(path, self.fallback_fps)
    }
}
