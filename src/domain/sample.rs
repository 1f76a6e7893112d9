// ============================================================
// Layer 3: Sample Domain Types
// ============================================================
// A dataset on disk looks like:
//
//   dataset/
//     a/   01_a_s1_take1.wav, 01_a_s2_take1.wav, ...
//     ba/  01_ba_s1_take1.wav, ...
//
// Every class directory name becomes a label. The label index is
// the position of the name after sorting, so the same set of
// directories always produces the same mapping.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One labelled audio file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Path to the audio file
    pub path: PathBuf,

    /// Dense class index into the LabelVocabulary
    pub label: usize,
}

impl SampleRecord {
    pub fn new(path: impl Into<PathBuf>, label: usize) -> Self {
        Self { path: path.into(), label }
    }
}

/// Ordered mapping from class name to dense integer index.
///
/// Names are sorted lexicographically and de-duplicated on
/// construction; index `i` is the `i`-th name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    names: Vec<String>,
}

impl LabelVocabulary {
    /// Build a vocabulary from class names in any order
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a class name, if present
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).ok()
    }

    /// Class name for an index, if in range
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// The output of the Sample Indexer: vocabulary plus the ordered
/// record sequence (class order, then file order within a class).
#[derive(Debug, Clone, Default)]
pub struct SampleIndex {
    pub vocabulary: LabelVocabulary,
    pub records:    Vec<SampleRecord>,
}

impl SampleIndex {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records per class, in vocabulary order
    pub fn class_counts(&self) -> Vec<(String, usize)> {
        let mut counts = vec![0usize; self.vocabulary.len()];
        for record in &self.records {
            if let Some(slot) = counts.get_mut(record.label) {
                *slot += 1;
            }
        }
        self.vocabulary
            .names()
            .iter()
            .cloned()
            .zip(counts)
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_is_sorted() {
        let vocab = LabelVocabulary::from_names(["ta", "a", "ba"]);
        assert_eq!(vocab.names(), &["a", "ba", "ta"]);
        assert_eq!(vocab.index_of("a"), Some(0));
        assert_eq!(vocab.index_of("ta"), Some(2));
        assert_eq!(vocab.index_of("kha"), None);
    }

    #[test]
    fn test_vocabulary_is_order_independent() {
        let first  = LabelVocabulary::from_names(["sin", "a", "ba", "syin"]);
        let second = LabelVocabulary::from_names(["syin", "ba", "sin", "a"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let vocab = LabelVocabulary::from_names(["ha", "ha", "a"]);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.name_of(1), Some("ha"));
    }

    #[test]
    fn test_class_counts_follow_vocabulary_order() {
        let index = SampleIndex {
            vocabulary: LabelVocabulary::from_names(["a", "ba"]),
            records: vec![
                SampleRecord::new("a/1.wav", 0),
                SampleRecord::new("a/2.wav", 0),
                SampleRecord::new("ba/1.wav", 1),
            ],
        };
        assert_eq!(
            index.class_counts(),
            vec![("a".to_string(), 2), ("ba".to_string(), 1)]
        );
    }
}
