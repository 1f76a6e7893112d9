use burn::data::dataset::Dataset;

use crate::domain::sample::SampleRecord;

/// Burn Dataset over sample records. Items are cheap (path + label);
/// decoding happens later in the batcher.
#[derive(Debug, Clone)]
pub struct AudioDataset {
    records: Vec<SampleRecord>,
}

impl AudioDataset {
    pub fn new(records: Vec<SampleRecord>) -> Self { Self { records } }

    /// Dataset over one contiguous slice of the records
    pub fn from_slice(records: &[SampleRecord]) -> Self {
        Self::new(records.to_vec())
    }

    pub fn sample_count(&self) -> usize { self.records.len() }
}

impl Dataset<SampleRecord> for AudioDataset {
    fn get(&self, index: usize) -> Option<SampleRecord> {
        self.records.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
