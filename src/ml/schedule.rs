//! Two-level (partition, epoch) training schedule.
//!
//! Positions advance epoch-major inside a partition, then move to
//! epoch 0 of the next partition. Resuming is a pure function of the
//! checkpointed position, so no loop counter carries over between
//! partitions.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrainPosition {
    pub partition: usize,
    pub epoch:     usize,
}

impl TrainPosition {
    pub const fn start() -> Self {
        Self { partition: 0, epoch: 0 }
    }

    /// Position after this one, or None when this was the last epoch
    /// of the last partition.
    pub fn next(self, epochs: usize, parts: usize) -> Option<Self> {
        if self.epoch + 1 < epochs {
            Some(Self { epoch: self.epoch + 1, ..self })
        } else if self.partition + 1 < parts {
            Some(Self { partition: self.partition + 1, epoch: 0 })
        } else {
            None
        }
    }

    /// Number of epochs completed before this position starts
    pub fn completed_epochs(self, epochs: usize) -> usize {
        self.partition * epochs + self.epoch
    }

    /// Run completion in percent at the start of this position
    pub fn progress_percent(self, epochs: usize, parts: usize) -> f64 {
        let total = (epochs * parts).max(1);
        self.completed_epochs(epochs) as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for TrainPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part {}, epoch {}", self.partition + 1, self.epoch + 1)
    }
}

/// Where training continues after the checkpoint taken at `saved`.
///
/// A checkpoint is written after an epoch completes, so the run picks
/// up at the following position. None means the checkpoint already
/// covers the whole schedule.
pub fn resume_position(saved: TrainPosition, epochs: usize, parts: usize) -> Option<TrainPosition> {
    saved.next(epochs, parts)
}

/// Every position from `from` to the end of the schedule, in order
pub fn positions_from(
    from: TrainPosition,
    epochs: usize,
    parts: usize,
) -> impl Iterator<Item = TrainPosition> {
    let first = (from.partition < parts && from.epoch < epochs).then_some(from);
    std::iter::successors(first, move |p| p.next(epochs, parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(partition: usize, epoch: usize) -> TrainPosition {
        TrainPosition { partition, epoch }
    }

    #[test]
    fn test_full_schedule_order() {
        let all: Vec<_> = positions_from(TrainPosition::start(), 2, 3).collect();
        assert_eq!(
            all,
            vec![pos(0, 0), pos(0, 1), pos(1, 0), pos(1, 1), pos(2, 0), pos(2, 1)]
        );
    }

    #[test]
    fn test_resume_mid_partition() {
        assert_eq!(resume_position(pos(1, 0), 3, 2), Some(pos(1, 1)));
    }

    #[test]
    fn test_resume_after_last_epoch_of_partition_moves_on() {
        assert_eq!(resume_position(pos(0, 2), 3, 2), Some(pos(1, 0)));
    }

    #[test]
    fn test_resume_after_final_epoch_is_done() {
        assert_eq!(resume_position(pos(1, 2), 3, 2), None);
    }

    #[test]
    fn test_resumed_run_resets_epoch_for_later_partitions() {
        let start = resume_position(pos(0, 1), 3, 3).unwrap();
        let rest: Vec<_> = positions_from(start, 3, 3).collect();
        assert_eq!(rest.first(), Some(&pos(0, 2)));
        assert_eq!(rest[1], pos(1, 0));
        assert_eq!(rest.len(), 7);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(pos(0, 0).progress_percent(50, 5), 0.0);
        assert_eq!(pos(2, 25).progress_percent(50, 5), 50.0);
    }

    #[test]
    fn test_display_is_one_based() {
        assert_eq!(pos(0, 4).to_string(), "part 1, epoch 5");
    }
}
