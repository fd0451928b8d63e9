use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::{
    config::Config,
    error::{PipelineError, Result, StitchError},
    pipeline::{
        cleanup::CleanupStage,
        concat::{ConcatenationPipeline, PipelineReport},
        convert::{intermediate_path, raw_clip_paths, ConversionStage},
    },
    timeline::Clip,
    video::{encoder::settings_for_output, probe, VideoEncoder, VideoSourceOpener},
};

/// Final status of one experiment within a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentStatus {
    Done,
    /// Output already existed and overwrite is off
    Skipped,
    Failed(String),
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentStatus::Done => write!(f, "done"),
            ExperimentStatus::Skipped => write!(f, "skipped (exists)"),
            ExperimentStatus::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Per-experiment outcomes of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub statuses: Vec<(String, ExperimentStatus)>,
}

impl BatchSummary {
    pub fn failed_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, s)| matches!(s, ExperimentStatus::Failed(_)))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Runs convert → align → concatenate → cleanup per experiment directory
///
/// A fatal error in one experiment is recorded and the batch moves on to the
/// next; only the final exit status reflects it.
pub struct BatchDriver {
    config: Config,
}

impl BatchDriver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Process every experiment directory under `root`
    ///
    /// `filter` restricts processing to directories whose name starts with
    /// the given prefix (the recording workflow names experiments by date,
    /// so `2024` picks out one year's worth).
    pub fn run(
        &self,
        root: &Path,
        output_dir: &Path,
        filter: Option<&str>,
    ) -> Result<BatchSummary> {
        let experiments = discover_experiments(root, filter)?;
        if experiments.is_empty() {
            warn!("No experiment directories found in {}", root.display());
            return Ok(BatchSummary::default());
        }

        std::fs::create_dir_all(output_dir)?;

        let mut summary = BatchSummary::default();
        for experiment in experiments {
            let name = experiment
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| experiment.display().to_string());
            let out_path = output_dir.join(format!("{name}.mp4"));

            info!("Experiment {name}");

            if out_path.exists() && !self.config.video.overwrite {
                info!("  -> skipped (exists)");
                summary.statuses.push((name, ExperimentStatus::Skipped));
                continue;
            }

            let status = match self.run_experiment(&experiment, &out_path) {
                Ok(report) => {
                    info!(
                        "  -> done: {} frames ({} real, {} filler)",
                        report.total_frames(),
                        report.real_frames,
                        report.filler_frames
                    );
                    ExperimentStatus::Done
                }
                Err(e) => {
                    error!("  -> failed: {e}");
                    ExperimentStatus::Failed(e.to_string())
                }
            };
            summary.statuses.push((name, status));
        }

        Ok(summary)
    }

    /// One experiment end to end; fatal errors propagate to the batch loop
    fn run_experiment(&self, experiment: &Path, out_path: &Path) -> Result<PipelineReport> {
        ConversionStage::new(&self.config).run(experiment)?;

        let clips = self.discover_clips(experiment)?;

        let opener = VideoSourceOpener {
            fallback_fps: self.config.video.frame_rate,
        };
        let pipeline = ConcatenationPipeline::new(&self.config);
        let result = pipeline.run(experiment, &clips, &opener, |width, height| {
            VideoEncoder::new(settings_for_output(
                out_path,
                width,
                height,
                self.config.video.frame_rate,
                &self.config.video.codec,
                self.config.video.overwrite,
            ))
        });

        match result {
            Ok(report) => {
                CleanupStage::new(&self.config).run(experiment)?;
                Ok(report)
            }
            Err(e) => {
                // Partial output is kept for inspection by default; a
                // mismatch abort can be configured to discard it.
                if matches!(
                    e,
                    StitchError::Pipeline(PipelineError::DimensionMismatch { .. })
                ) && self.config.video.discard_partial_output
                    && out_path.exists()
                {
                    if let Err(remove_err) = std::fs::remove_file(out_path) {
                        warn!(
                            "Could not discard partial output {}: {}",
                            out_path.display(),
                            remove_err
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Build sorted clip records from raw files and their intermediates
    ///
    /// Each clip pairs the raw file's modification time (the recording start)
    /// with the probed frame count of its intermediate. Clips missing an
    /// intermediate or failing the probe are left out with a warning.
    fn discover_clips(&self, experiment: &Path) -> Result<Vec<Clip>> {
        let frame_rate = self.config.video.frame_rate;
        let mut clips = Vec::new();

        for raw_path in raw_clip_paths(experiment, &self.config.conversion)? {
            let part_path = intermediate_path(&raw_path, &self.config.conversion);
            if !part_path.exists() {
                warn!("No intermediate for {}; skipping", raw_path.display());
                continue;
            }

            let metadata = match probe::probe(&part_path, frame_rate) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Probe failed for {}: {}; skipping", part_path.display(), e);
                    continue;
                }
            };

            let mtime = match std::fs::metadata(&raw_path).and_then(|m| m.modified()) {
                Ok(mtime) => mtime,
                Err(e) => {
                    warn!("No mtime for {}: {}; skipping", raw_path.display(), e);
                    continue;
                }
            };

            clips.push(Clip::with_mtime(
                raw_path,
                part_path,
                mtime,
                metadata.frame_count,
                frame_rate,
            ));
        }

        clips.sort_by_key(|c| c.recorded_start);
        Ok(clips)
    }
}

/// Experiment directories under `root`, optionally filtered by name prefix,
/// sorted by name
fn discover_experiments(root: &Path, filter: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut experiments = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name_matches = match filter {
            Some(prefix) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(prefix))
                .unwrap_or(false),
            None => true,
        };

        if name_matches {
            experiments.push(path);
        }
    }

    experiments.sort();
    Ok(experiments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_discover_experiments_filters_by_prefix() {
        let dir = tempdir().unwrap();
        for name in ["2024-01-11_a", "2024-02-03_b", "2023-12-31_c"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("2024_notes.txt"), b"x").unwrap();

        let all = discover_experiments(dir.path(), None).unwrap();
        assert_eq!(all.len(), 3);

        let filtered = discover_experiments(dir.path(), Some("2024")).unwrap();
        let names: Vec<String> = filtered
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2024-01-11_a", "2024-02-03_b"]);
    }

    #[test]
    fn test_existing_output_is_skipped_without_overwrite() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::create_dir(root.path().join("exp1")).unwrap();
        std::fs::write(out.path().join("exp1.mp4"), b"existing").unwrap();

        let mut config = Config::default();
        config.video.overwrite = false;

        let driver = BatchDriver::new(config);
        let summary = driver.run(root.path(), out.path(), None).unwrap();

        assert_eq!(
            summary.statuses,
            vec![("exp1".to_string(), ExperimentStatus::Skipped)]
        );
        assert!(summary.all_succeeded());
    }

    #[test]
    fn test_empty_experiment_fails_but_batch_continues() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        std::fs::create_dir(root.path().join("exp_empty")).unwrap();
        std::fs::create_dir(root.path().join("exp_skipped")).unwrap();
        std::fs::write(out.path().join("exp_skipped.mp4"), b"existing").unwrap();

        let mut config = Config::default();
        config.video.overwrite = false;

        let driver = BatchDriver::new(config);
        let summary = driver.run(root.path(), out.path(), None).unwrap();

        assert_eq!(summary.statuses.len(), 2);
        assert!(matches!(
            summary.statuses[0].1,
            ExperimentStatus::Failed(_)
        ));
        assert_eq!(summary.statuses[1].1, ExperimentStatus::Skipped);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.failed_count(), 1);
    }

    #[test]
    fn test_empty_root_yields_empty_summary() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();

        let driver = BatchDriver::new(Config::default());
        let summary = driver.run(root.path(), out.path(), None).unwrap();
        assert!(summary.statuses.is_empty());
        assert!(summary.all_succeeded());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ExperimentStatus::Done.to_string(), "done");
        assert_eq!(ExperimentStatus::Skipped.to_string(), "skipped (exists)");
        assert_eq!(
            ExperimentStatus::Failed("no clips".to_string()).to_string(),
            "failed (no clips)"
        );
    }
}
