use crate::core::progress::ProgressReporter;
use crate::domain::model::{ArchiveFailure, ExtractionOutcome, ProgressEvent};
use crate::utils::error::Result;
use std::fs::File;
use std::path::{Path, PathBuf};

const ARCHIVE_EXTENSION: &str = ".zip";

/// Unpacks every archive in the download directory into one flat output tree.
///
/// Archives are processed in ascending batch order (`1-50.zip` before `51-100.zip`),
/// so when two archives contain the same entry name the later batch wins.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    download_dir: PathBuf,
    output_dir: PathBuf,
    progress: ProgressReporter,
}

impl ArchiveExtractor {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(download_dir: P, output_dir: Q) -> Self {
        Self {
            download_dir: download_dir.into(),
            output_dir: output_dir.into(),
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Archives that fail to open or unpack are reported and skipped.
    pub fn extract_all(&self) -> Result<ExtractionOutcome> {
        std::fs::create_dir_all(&self.output_dir)?;
        self.progress.message(format!(
            "Unzipping to {}",
            std::path::absolute(&self.output_dir)
                .unwrap_or_else(|_| self.output_dir.clone())
                .display()
        ));

        let mut outcome = ExtractionOutcome::default();
        for name in self.archive_names()? {
            let path = self.download_dir.join(&name);
            match extract_archive(&path, &self.output_dir) {
                Ok(written) => {
                    outcome.files_written += written;
                    self.progress
                        .emit(ProgressEvent::ArchiveExtracted(name.clone()));
                    outcome.extracted.push(name);
                }
                Err(e) => {
                    let failure = ArchiveFailure {
                        archive: name,
                        reason: e.to_string(),
                    };
                    self.progress
                        .emit(ProgressEvent::ArchiveFailed(failure.clone()));
                    outcome.failed.push(failure);
                }
            }
        }

        Ok(outcome)
    }

    fn archive_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.download_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(ARCHIVE_EXTENSION) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort_by_key(|name| batch_order(name));
        Ok(names)
    }
}

/// Sort key: batch archives by their first offset, anything else after them by name.
fn batch_order(name: &str) -> (u8, usize, String) {
    let first = name
        .strip_suffix(ARCHIVE_EXTENSION)
        .and_then(|stem| stem.split_once('-'))
        .and_then(|(first, _)| first.parse::<usize>().ok());
    match first {
        Some(first) => (0, first, name.to_string()),
        None => (1, 0, name.to_string()),
    }
}

/// Unpacks one archive into `dest`, returning the number of files written.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(
                "Skipping entry with unsafe path {} in {}",
                entry.name(),
                archive_path.display()
            );
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    tracing::debug!(
        "Extracted {} files from {}",
        written,
        archive_path.display()
    );
    Ok(written)
}
