//! Cursor over the ordered question list.

/// Clamped navigation state.
///
/// Nothing here is persisted: a reload always resumes at the first question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionNavigator {
    current: usize,
    total: usize,
}

impl QuestionNavigator {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Advances one question; stepping past the last is a no-op.
    pub fn next(&mut self) -> usize {
        if self.current + 1 < self.total {
            self.current += 1;
        }
        self.current
    }

    /// Steps back one question; stepping before the first is a no-op.
    pub fn previous(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// Jumps straight to an index, clamping to the last question.
    pub fn jump(&mut self, index: usize) -> usize {
        if self.total > 0 {
            self.current = index.min(self.total - 1);
        }
        self.current
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
