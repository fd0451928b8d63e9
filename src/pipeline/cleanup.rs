use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{config::Config, error::Result};

/// Removes per-clip intermediates after a successful concatenation
///
/// Deletion failures (a file still held open by another process, say) are
/// logged and non-fatal; the intermediates get another chance on the next
/// run.
pub struct CleanupStage<'a> {
    config: &'a Config,
}

impl<'a> CleanupStage<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn run(&self, experiment: &Path) -> Result<()> {
        if !self.config.conversion.cleanup_intermediates {
            debug!("Keeping intermediates in {}", experiment.display());
            return Ok(());
        }

        let intermediates = intermediate_files(experiment, &self.config.conversion.intermediate_prefix)?;
        info!("Deleting {} intermediate files", intermediates.len());

        for path in intermediates {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Could not delete {}: {}", path.display(), e);
            }
        }

        Ok(())
    }
}

/// Files matching the intermediate convention (`<prefix>*.mp4`)
fn intermediate_files(experiment: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(experiment)? {
        let entry = entry?;
        let path = entry.path();

        let name_matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(prefix))
            .unwrap_or(false);
        let is_mp4 = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false);

        if path.is_file() && name_matches && is_mp4 {
            paths.push(path);
        }
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cleanup_removes_only_intermediates() {
        let dir = tempdir().unwrap();
        for name in ["part_a.mp4", "part_b.mp4", "a.MOV", "keep.mp4"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let config = Config::default();
        CleanupStage::new(&config).run(dir.path()).unwrap();

        assert!(!dir.path().join("part_a.mp4").exists());
        assert!(!dir.path().join("part_b.mp4").exists());
        assert!(dir.path().join("a.MOV").exists());
        assert!(dir.path().join("keep.mp4").exists());
    }

    #[test]
    fn test_cleanup_respects_keep_flag() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("part_a.mp4"), b"x").unwrap();

        let mut config = Config::default();
        config.conversion.cleanup_intermediates = false;
        CleanupStage::new(&config).run(dir.path()).unwrap();

        assert!(dir.path().join("part_a.mp4").exists());
    }
}
