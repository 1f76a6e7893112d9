// ============================================================
// Layer 2: InspectUseCase
// ============================================================
// Collects read-only statistics about a dataset directory and
// optionally saves them as JSON. Printing is left to the CLI.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::inspector::{dataset_stats, hijaiyah_stats, DatasetStats, HijaiyahStats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectReport {
    pub dataset_dir: PathBuf,
    pub general:     DatasetStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hijaiyah:    Option<HijaiyahStats>,
}

pub struct InspectUseCase {
    pub dataset_dir: PathBuf,
    /// Also report per-letter coverage
    pub hijaiyah:    bool,
    /// Write the report here as pretty JSON
    pub save_to:     Option<PathBuf>,
}

impl InspectUseCase {
    pub fn execute(&self) -> Result<InspectReport> {
        tracing::info!("Inspecting '{}'", self.dataset_dir.display());

        let general  = dataset_stats(&self.dataset_dir)?;
        let hijaiyah = if self.hijaiyah {
            Some(hijaiyah_stats(&self.dataset_dir)?)
        } else {
            None
        };
        let report = InspectReport { dataset_dir: self.dataset_dir.clone(), general, hijaiyah };

        if let Some(path) = &self.save_to {
            let json = serde_json::to_string_pretty(&report)?;
            fs::write(path, json)
                .with_context(|| format!("Cannot write stats to '{}'", path.display()))?;
            tracing::info!("Statistics saved to '{}'", path.display());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_is_saved_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(data.join("ba")).unwrap();
        fs::write(data.join("ba").join("1_ba_1_a.wav"), [0u8; 10]).unwrap();
        fs::write(data.join("notes.txt"), "x").unwrap();

        let out = dir.path().join("stats.json");
        let report = InspectUseCase { dataset_dir: data, hijaiyah: true, save_to: Some(out.clone()) }
            .execute()
            .unwrap();

        assert_eq!(report.general.audio_files, 1);
        assert_eq!(report.general.text_files, 1);
        let letters = report.hijaiyah.as_ref().unwrap();
        assert_eq!(letters.by_letter["ba"].count, 1);

        let saved: InspectReport = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(saved, report);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = InspectUseCase {
            dataset_dir: dir.path().join("nope"),
            hijaiyah:    false,
            save_to:     None,
        };
        assert!(use_case.execute().is_err());
    }
}
