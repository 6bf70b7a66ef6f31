/// Error tally for one balance stance, clamped to `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCounter {
    count: u32,
    max: u32,
}

impl ErrorCounter {
    pub fn new(max: u32) -> Self {
        Self { count: 0, max }
    }

    /// Add one error. Saturates at `max`.
    pub fn increment(&mut self) -> u32 {
        self.count = (self.count + 1).min(self.max);
        self.count
    }

    /// Remove one error. Never goes below zero.
    pub fn undo(&mut self) -> u32 {
        self.count = self.count.saturating_sub(1);
        self.count
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_at_max() {
        let mut c = ErrorCounter::new(10);
        for _ in 0..12 {
            c.increment();
        }
        assert_eq!(c.count(), 10);
    }

    #[test]
    fn undo_stops_at_zero() {
        let mut c = ErrorCounter::new(10);
        c.increment();
        assert_eq!(c.undo(), 0);
        assert_eq!(c.undo(), 0);
    }
}
