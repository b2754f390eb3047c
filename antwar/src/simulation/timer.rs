// Tick counter, counts up from 0 to max_value

#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub max_value: u32,
    pub value: u32,
}

impl Timer {
    /// Create a new timer with a max value and an initial value
    pub fn new(max_value: u32, initial_value: u32) -> Self {
        Self {
            max_value: max_value.max(1),
            value: initial_value,
        }
    }

    /// Returns true once the timer reached its max value
    pub fn is_ready(&self) -> bool {
        self.value >= self.max_value
    }

    /// Advance by `ticks`
    pub fn update(&mut self, ticks: u32) {
        self.value = self.value.saturating_add(ticks);
    }

    /// Wraps the timer value back within bounds.
    pub fn wrap(&mut self) {
        self.value %= self.max_value;
    }

    /// Elapsed share in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        (self.value as f32 / self.max_value as f32).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_after_max_ticks_and_wraps() {
        let mut timer = Timer::new(120, 0);
        timer.update(119);
        assert!(!timer.is_ready());
        timer.update(3);
        assert!(timer.is_ready());
        timer.wrap();
        assert_eq!(timer.value, 2);
        assert!((timer.progress() - 2.0 / 120.0).abs() < 1e-6);
    }
}
