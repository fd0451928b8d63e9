use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::{
    config::{Config, ConversionConfig},
    error::Result,
};

/// Re-encodes each raw recording into a per-clip intermediate
///
/// Thin wrapper around one `ffmpeg` invocation per clip; the intermediate is
/// written next to the raw file as `part_<stem>.mp4` at the pipeline frame
/// rate, which is the contract the concatenation stage relies on. A clip
/// that fails to convert is logged and left out; the pipeline will treat it
/// like any other unreadable clip.
pub struct ConversionStage<'a> {
    config: &'a Config,
}

impl<'a> ConversionStage<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn run(&self, experiment: &Path) -> Result<()> {
        let raw_paths = raw_clip_paths(experiment, &self.config.conversion)?;
        if raw_paths.is_empty() {
            warn!(
                "No .{} files in {}",
                self.config.conversion.raw_extension,
                experiment.display()
            );
            return Ok(());
        }

        info!("Converting {} raw clips", raw_paths.len());
        for (index, raw_path) in raw_paths.iter().enumerate() {
            let out_path = intermediate_path(raw_path, &self.config.conversion);

            if out_path.exists() && !self.config.video.overwrite {
                debug!("Already converted: {}", out_path.display());
                continue;
            }

            debug!(
                "{:3}/{} {}",
                index + 1,
                raw_paths.len(),
                raw_path.display()
            );
            if let Err(reason) = self.convert_one(raw_path, &out_path) {
                warn!("Conversion failed for {}: {}", raw_path.display(), reason);
                // A half-written intermediate would poison the next run.
                if out_path.exists() {
                    let _ = std::fs::remove_file(&out_path);
                }
            }
        }

        Ok(())
    }

    fn convert_one(&self, raw_path: &Path, out_path: &Path) -> std::result::Result<(), String> {
        let output = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-i"])
            .arg(raw_path)
            .args([
                "-r",
                &self.config.video.frame_rate.to_string(),
                "-an",
                "-c:v",
                &self.config.video.codec,
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(out_path)
            .output()
            .map_err(|e| format!("failed to run ffmpeg: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }
}

/// Raw recordings in an experiment directory, sorted by file name
///
/// Name order matches recording order for the camera naming schemes this
/// targets, but the pipeline re-sorts clips by recorded start time anyway.
pub fn raw_clip_paths(experiment: &Path, conversion: &ConversionConfig) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(experiment)? {
        let entry = entry?;
        let path = entry.path();

        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&conversion.raw_extension))
            .unwrap_or(false);

        if path.is_file() && matches_extension {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Intermediate path for a raw clip: `<dir>/<prefix><stem>.mp4`
pub fn intermediate_path(raw_path: &Path, conversion: &ConversionConfig) -> PathBuf {
    let stem = raw_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());

    let file_name = format!("{}{}.mp4", conversion.intermediate_prefix, stem);
    match raw_path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
