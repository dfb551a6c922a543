/// Window depth shared by the start and stop filters
pub const MAXAVG: usize = 5;

/// Bounded moving-average window
///
/// Grows until `MAXAVG` samples have been inserted, then behaves as a FIFO.
/// The window owns its insertion count.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageWindow {
    samples: [f64; MAXAVG],
    count: usize,
}

impl MovingAverageWindow {
    pub fn new() -> Self {
        Self {
            samples: [0.0; MAXAVG],
            count: 0,
        }
    }

    /// Insert a sample and return the current mean
    pub fn insert(&mut self, value: f64) -> f64 {
        if self.count < MAXAVG {
            self.samples[self.count] = value;
            self.count += 1;
        } else {
            self.samples.copy_within(1.., 0);
            self.samples[MAXAVG - 1] = value;
        }

        self.mean()
    }

    /// Mean over the stored samples, 0.0 when nothing has been inserted
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.samples[..self.count].iter().sum::<f64>() / self.count as f64
    }

    /// Restart the insertion count, keeping slot contents
    pub fn reset_count(&mut self) {
        self.count = 0;
    }

    /// Zero-fill every slot and restart the insertion count
    pub fn clear(&mut self) {
        self.samples = [0.0; MAXAVG];
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAXAVG
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples[..self.count]
    }
}

impl Default for MovingAverageWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_growing_window_mean() {
        let mut window = MovingAverageWindow::new();

        assert_relative_eq!(window.insert(10.0), 10.0);
        assert_relative_eq!(window.insert(20.0), 15.0);
        assert_relative_eq!(window.insert(30.0), 20.0);
        assert_eq!(window.len(), 3);
        assert!(!window.is_full());
    }

    #[test]
    fn test_fifo_after_capacity() {
        let mut window = MovingAverageWindow::new();

        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            window.insert(value);
        }
        assert!(window.is_full());
        assert_relative_eq!(window.mean(), 3.0);

        // Oldest (1.0) is dropped: (2+3+4+5+6)/5
        assert_relative_eq!(window.insert(6.0), 4.0);
        assert_eq!(window.samples(), &[2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(window.len(), MAXAVG);

        // (3+4+5+6+17)/5
        assert_relative_eq!(window.insert(17.0), 7.0);
    }

    #[test]
    fn test_reset_count_ignores_stale_slots() {
        let mut window = MovingAverageWindow::new();
        for value in [100.0, 100.0, 100.0, 100.0, 100.0] {
            window.insert(value);
        }

        window.reset_count();
        assert!(window.is_empty());

        // Stale slots beyond the count must not leak into the mean
        assert_relative_eq!(window.insert(60.0), 60.0);
        assert_relative_eq!(window.insert(62.0), 61.0);
    }

    #[test]
    fn test_clear_zero_fills() {
        let mut window = MovingAverageWindow::new();
        window.insert(70.0);
        window.insert(71.0);

        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window, MovingAverageWindow::new());
    }

    #[test]
    fn test_mean_empty() {
        let window = MovingAverageWindow::default();
        assert_eq!(window.mean(), 0.0);
    }
}
