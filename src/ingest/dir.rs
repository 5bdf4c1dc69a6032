use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::FrameSource;
use crate::frame::Frame;

/// Image-directory frame source (`dir://path`).
///
/// Treats a directory of still images as a finite video: files are visited in
/// name order, decoded to RGB8, and the stream ends after the last file.
/// Undecodable files are skipped with a warning rather than stopping the run.
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files: Vec::new(),
            cursor: 0,
        }
    }
}

impl FrameSource for ImageDirSource {
    fn connect(&mut self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("failed to open frame directory {}", self.dir.display()))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        log::info!(
            "ImageDirSource: connected to {} ({} files)",
            self.dir.display(),
            files.len()
        );
        self.files = files;
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        while self.cursor < self.files.len() {
            let path = self.files[self.cursor].clone();
            self.cursor += 1;

            let decoded = match image::open(&path) {
                Ok(img) => img.to_rgb8(),
                Err(err) => {
                    log::warn!("skipping undecodable file {}: {}", path.display(), err);
                    continue;
                }
            };

            let (width, height) = decoded.dimensions();
            let frame = Frame::new(decoded.into_raw(), width, height)?;
            return Ok(Some(frame));
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        format!("dir://{}", self.dir.display())
    }
}
