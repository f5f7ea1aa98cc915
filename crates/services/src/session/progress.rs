/// Answered-vs-total snapshot for the progress display.
///
/// Only non-empty answers count as answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionProgress {
    pub answered: usize,
    pub total: usize,
}

impl SessionProgress {
    /// Fraction answered in `0.0..=1.0`; zero questions counts as zero.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.answered as f64 / self.total as f64
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.answered == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_handles_empty_test() {
        assert_eq!(SessionProgress::default().ratio(), 0.0);
        assert!(!SessionProgress::default().is_complete());
    }

    #[test]
    fn ratio_reflects_answered_share() {
        let progress = SessionProgress {
            answered: 2,
            total: 5,
        };
        assert!((progress.ratio() - 0.4).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
        let done = SessionProgress {
            answered: 5,
            total: 5,
        };
        assert!(done.is_complete());
    }
}
