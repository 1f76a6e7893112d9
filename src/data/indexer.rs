// ============================================================
// Layer 4: Sample Indexer
// ============================================================
// Walks `root/<class>/<file>.wav` and produces the label
// vocabulary plus an ordered list of (file, label) records.
//
// Ordering rules:
//   - classes are sorted lexicographically (label index = position)
//   - files inside a class are sorted by file name
//
// The trainer slices this list into contiguous partitions, so the
// order has to be the same on every run and every file system.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::TrainError;
use crate::domain::sample::{LabelVocabulary, SampleIndex, SampleRecord};
use crate::domain::traits::SampleSource;

/// File extensions the feature extractor can decode
pub const AUDIO_EXTENSIONS: &[&str] = &["wav"];

/// Indexes a class-per-directory audio dataset.
/// Implements the SampleSource trait from Layer 3.
pub struct DirectoryIndexer {
    root: PathBuf,
}

impl DirectoryIndexer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn not_found(&self, reason: impl Into<String>) -> TrainError {
        TrainError::DatasetNotFound {
            path:   self.root.clone(),
            reason: reason.into(),
        }
    }
}

impl SampleSource for DirectoryIndexer {
    fn index(&self) -> Result<SampleIndex, TrainError> {
        if !self.root.is_dir() {
            return Err(self.not_found("directory does not exist"));
        }

        let class_names = sorted_subdirectories(&self.root)?;
        if class_names.is_empty() {
            return Err(self.not_found("no class directories"));
        }
        let vocabulary = LabelVocabulary::from_names(class_names);

        let mut records = Vec::new();
        for (label, class_name) in vocabulary.names().iter().enumerate() {
            let class_dir = self.root.join(class_name);
            let files     = sorted_audio_files(&class_dir)?;
            tracing::debug!("Class '{}' (label {}): {} files", class_name, label, files.len());
            records.extend(files.into_iter().map(|path| SampleRecord::new(path, label)));
        }

        if records.is_empty() {
            return Err(self.not_found("no audio files in any class directory"));
        }

        tracing::info!(
            "Indexed {} samples across {} classes in '{}'",
            records.len(),
            vocabulary.len(),
            self.root.display()
        );
        Ok(SampleIndex { vocabulary, records })
    }
}

/// True when the file name carries one of the recognised audio extensions
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn sorted_subdirectories(root: &Path) -> Result<Vec<String>, TrainError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| TrainError::io(root, e))? {
        let entry = entry.map_err(|e| TrainError::io(root, e))?;
        let path  = entry.path();
        if !path.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => tracing::warn!("Skipping class directory with non UTF-8 name {:?}", raw),
        }
    }
    names.sort();
    Ok(names)
}

fn sorted_audio_files(dir: &Path) -> Result<Vec<PathBuf>, TrainError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| TrainError::io(dir, e))? {
        let path = entry.map_err(|e| TrainError::io(dir, e))?.path();
        if path.is_file() && is_audio_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
