//! Progress estimation while a task is generating.
//!
//! Many deployments of the remote API never report progress, which leaves a
//! progress bar frozen at zero for minutes. The estimator blends whatever the
//! remote says with a local step that creeps towards a ceiling, and never
//! lets the value go backwards.

/// Local progress estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEstimator {
    /// Added to the previous value on every in-progress poll.
    pub step: u8,

    /// Local estimates never exceed this (remote values may).
    pub ceiling: u8,
}

impl ProgressEstimator {
    pub fn new(step: u8, ceiling: u8) -> Self {
        Self {
            step,
            ceiling: ceiling.min(100),
        }
    }

    /// Next progress value after an in-progress poll.
    ///
    /// `max(previous, remote, min(previous + step, ceiling))`, with `remote`
    /// clamped to 100.
    pub fn next(&self, previous: u8, remote: Option<u8>) -> u8 {
        let local = previous.saturating_add(self.step).min(self.ceiling);
        let remote = remote.map(|r| r.min(100)).unwrap_or(0);
        previous.max(local).max(remote)
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(10, 90)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::first_poll(0, None, 10)]
    #[case::steady(40, None, 50)]
    #[case::near_ceiling(85, None, 90)]
    #[case::at_ceiling(90, None, 90)]
    #[case::remote_ahead(20, Some(55), 55)]
    #[case::remote_behind(60, Some(15), 70)]
    #[case::remote_beyond_ceiling(88, Some(97), 97)]
    #[case::remote_out_of_range(10, Some(250), 100)]
    #[case::previous_above_ceiling(95, None, 95)]
    fn next_value(#[case] previous: u8, #[case] remote: Option<u8>, #[case] expected: u8) {
        let estimator = ProgressEstimator::default();
        assert_eq!(estimator.next(previous, remote), expected);
    }

    #[test]
    fn never_decreases_over_a_long_run() {
        let estimator = ProgressEstimator::default();
        let remote = [None, Some(5), None, Some(70), Some(30), None, None, Some(99), None];

        let mut progress = 0;
        for r in remote {
            let next = estimator.next(progress, r);
            assert!(next >= progress, "{next} < {progress}");
            progress = next;
        }
        assert_eq!(progress, 99);
    }

    #[test]
    fn ceiling_is_capped_at_100() {
        assert_eq!(ProgressEstimator::new(10, 150).ceiling, 100);
    }
}
