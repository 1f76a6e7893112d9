//! Read-only dataset statistics.
//!
//! Two reports are produced: a general breakdown (files per class,
//! file types, total size) and, for hijaiyah datasets, per-letter
//! coverage parsed from `<speaker>_<letter>_<session>_<take>.wav`
//! file names.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::domain::error::TrainError;

const AUDIO_EXT: &[&str] = &["wav", "mp3", "ogg"];
const IMAGE_EXT: &[&str] = &["jpg", "jpeg", "png"];
const TEXT_EXT:  &[&str] = &["txt"];

/// Letter keys expected in a complete hijaiyah dataset, with display names
pub const EXPECTED_LETTERS: &[(&str, &str)] = &[
    ("a", "Alif"), ("ba", "Ba"), ("ta", "Ta"), ("tsa", "Tsa"), ("ja", "Jim"),
    ("ha", "Ha"), ("kha", "Kha"), ("dha", "Dal"), ("da", "Dzal"), ("ra", "Ra"),
    ("za", "Za"), ("sin", "Sin"), ("syin", "Syin"), ("sho", "Shad"), ("dho", "Dhad"),
    ("tha", "Tha"), ("zha", "Zha"), ("an", "Ain"), ("gho", "Ghoin"), ("fa", "Fa"),
    ("qa", "Qaf"), ("ka", "Kaf"), ("la", "Lam"), ("ma", "Mim"), ("nun", "Nun"),
    ("wa", "Wau"), ("ya", "Ya"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_files:   usize,
    pub total_classes: usize,
    /// Audio files per class directory
    pub classes:       BTreeMap<String, usize>,
    pub audio_files:   usize,
    pub image_files:   usize,
    pub text_files:    usize,
    pub size_mb:       f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LetterStats {
    pub count:    usize,
    pub speakers: BTreeSet<String>,
    pub sessions: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HijaiyahStats {
    pub audio_files:     usize,
    pub total_size_mb:   f64,
    pub by_letter:       BTreeMap<String, LetterStats>,
    /// "Name (key)" of every expected letter with no files
    pub missing_letters: Vec<String>,
}

fn has_extension(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| set.iter().any(|k| e.eq_ignore_ascii_case(k)))
}

/// Every file under `root`, recursively, with its size in bytes
fn walk_files(root: &Path) -> Result<Vec<(PathBuf, u64)>, TrainError> {
    let mut out   = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).map_err(|e| TrainError::io(&dir, e))? {
            let entry = entry.map_err(|e| TrainError::io(&dir, e))?;
            let path  = entry.path();
            let meta  = entry.metadata().map_err(|e| TrainError::io(&path, e))?;
            if meta.is_dir() {
                stack.push(path);
            } else if meta.is_file() {
                out.push((path, meta.len()));
            }
        }
    }
    out.sort();
    Ok(out)
}

fn to_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

/// General statistics: one class per directory below the root.
pub fn dataset_stats(root: &Path) -> Result<DatasetStats, TrainError> {
    if !root.is_dir() {
        return Err(TrainError::DatasetNotFound {
            path:   root.to_path_buf(),
            reason: "directory does not exist".into(),
        });
    }

    let mut stats = DatasetStats::default();
    let mut bytes = 0u64;
    for (path, size) in walk_files(root)? {
        stats.total_files += 1;
        bytes += size;

        let class = path
            .parent()
            .filter(|p| *p != root)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        if let Some(class) = &class {
            stats.classes.entry(class.clone()).or_insert(0);
        }

        if has_extension(&path, AUDIO_EXT) {
            stats.audio_files += 1;
            if let Some(class) = class {
                *stats.classes.entry(class).or_insert(0) += 1;
            }
        } else if has_extension(&path, IMAGE_EXT) {
            stats.image_files += 1;
        } else if has_extension(&path, TEXT_EXT) {
            stats.text_files += 1;
        }
    }
    stats.total_classes = stats.classes.len();
    stats.size_mb = to_mb(bytes);
    Ok(stats)
}

/// Split `<speaker>_<letter>_<session>_<rest>` into its parts
fn parse_hijaiyah_name(file_name: &str) -> Option<(&str, &str, &str)> {
    if !file_name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let parts: Vec<&str> = file_name.split('_').collect();
    (parts.len() >= 4).then(|| (parts[0], parts[1], parts[2]))
}

/// Per-letter coverage of a hijaiyah dataset.
pub fn hijaiyah_stats(root: &Path) -> Result<HijaiyahStats, TrainError> {
    if !root.is_dir() {
        return Err(TrainError::DatasetNotFound {
            path:   root.to_path_buf(),
            reason: "directory does not exist".into(),
        });
    }

    let mut stats = HijaiyahStats::default();
    for (key, _) in EXPECTED_LETTERS {
        stats.by_letter.insert(key.to_string(), LetterStats::default());
    }

    let mut bytes = 0u64;
    for (path, size) in walk_files(root)? {
        if !has_extension(&path, &["wav"]) {
            continue;
        }
        stats.audio_files += 1;
        bytes += size;

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if let Some((speaker, letter, session)) = parse_hijaiyah_name(&name) {
            if let Some(entry) = stats.by_letter.get_mut(letter) {
                entry.count += 1;
                entry.speakers.insert(speaker.to_string());
                entry.sessions.insert(session.to_string());
            }
        }
    }
    stats.total_size_mb = to_mb(bytes);

    stats.missing_letters = EXPECTED_LETTERS
        .iter()
        .filter(|(key, _)| stats.by_letter.get(*key).is_some_and(|l| l.count == 0))
        .map(|(key, name)| format!("{name} ({key})"))
        .collect();
    stats.missing_letters.sort();
    Ok(stats)
}
