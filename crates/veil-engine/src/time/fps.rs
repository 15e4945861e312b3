use std::time::{Duration, Instant};

/// Counts presented frames and reports the count once per window.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    window_start: Option<Instant>,
    frames: u32,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            frames: 0,
        }
    }

    /// Records one frame at `now`.
    ///
    /// Returns the number of frames in the window once the window has elapsed,
    /// then starts a new window.
    pub fn record(&mut self, now: Instant) -> Option<u32> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        if now.saturating_duration_since(start) <= self.window {
            return None;
        }

        let frames = self.frames;
        self.frames = 0;
        self.window_start = Some(now);
        Some(frames)
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_after_window_elapses() {
        let mut fps = FpsMeter::new();
        let t0 = Instant::now();
        for i in 0..60 {
            assert_eq!(fps.record(t0 + Duration::from_millis(i * 16)), None);
        }
        assert_eq!(fps.record(t0 + Duration::from_millis(1001)), Some(61));
    }

    #[test]
    fn counter_resets_after_report() {
        let mut fps = FpsMeter::with_window(Duration::from_millis(10));
        let t0 = Instant::now();
        fps.record(t0);
        assert_eq!(fps.record(t0 + Duration::from_millis(11)), Some(2));
        assert_eq!(fps.record(t0 + Duration::from_millis(12)), None);
        assert_eq!(fps.record(t0 + Duration::from_millis(30)), Some(2));
    }
}
