//! Frame timing.

/// Per-frame time state handed to scenes.
///
/// `delta` is scaled by `time_rate`; transitions advance on the unscaled
/// `raw_delta` so slow-motion effects never stretch a scene change.
#[derive(Clone, Debug)]
pub struct Time {
    total: f32,
    raw_delta: f32,
    time_rate: f32,
    frame: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            total: 0.0,
            raw_delta: 0.0,
            time_rate: 1.0,
            frame: 0,
        }
    }
}

impl Time {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds of wall-clock time. Negative deltas are clamped to zero.
    pub fn advance(&mut self, dt: f32) {
        self.raw_delta = dt.max(0.0);
        self.total += self.raw_delta;
        self.frame += 1;
    }

    /// Scaled delta time in seconds.
    pub fn delta(&self) -> f32 {
        self.raw_delta * self.time_rate
    }

    /// Unscaled delta time in seconds.
    pub fn raw_delta(&self) -> f32 {
        self.raw_delta
    }

    /// Total unscaled time since start.
    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn time_rate(&self) -> f32 {
        self.time_rate
    }

    pub fn set_time_rate(&mut self, rate: f32) {
        self.time_rate = rate.max(0.0);
    }

    pub fn reset_time_rate(&mut self) {
        self.time_rate = 1.0;
    }

    /// Frames per second derived from the last delta.
    pub fn fps(&self) -> f32 {
        if self.raw_delta > 0.0 { 1.0 / self.raw_delta } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_scaled_by_rate() {
        let mut time = Time::new();
        time.set_time_rate(0.5);
        time.advance(0.2);
        assert_eq!(time.raw_delta(), 0.2);
        assert_eq!(time.delta(), 0.1);
        assert_eq!(time.frame(), 1);

        time.reset_time_rate();
        assert_eq!(time.delta(), 0.2);
    }

    #[test]
    fn negative_delta_is_ignored() {
        let mut time = Time::new();
        time.advance(-1.0);
        assert_eq!(time.total(), 0.0);
        assert_eq!(time.fps(), 0.0);
    }
}
