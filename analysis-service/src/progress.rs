/// Receives progress percentages in `[0, 100]` during a classification run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: f64);
}

impl<F> ProgressReporter for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Turns processed counts into a monotonically non-decreasing percentage.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    highest: f64,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self { total, highest: 0.0 }
    }

    /// Record that `processed` posts have been attempted and return the
    /// running maximum percentage.
    pub fn advance(&mut self, processed: usize) -> f64 {
        let percent = if self.total == 0 {
            100.0
        } else {
            (processed as f64 / self.total as f64 * 100.0).min(100.0)
        };
        if percent > self.highest {
            self.highest = percent;
        }
        self.highest
    }

    pub fn current(&self) -> f64 {
        self.highest
    }
}
