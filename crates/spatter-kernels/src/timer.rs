//! Monotonic start/stop timer.

use std::time::{Duration, Instant};

/// Wall-clock timer over [`Instant`].
///
/// `start` and `stop` must be paired. [`Timer::seconds`] reports the most
/// recently completed bracket.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started: Option<Instant>,
    last: Duration,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// # Panics
    ///
    /// Panics if there is no matching [`Timer::start`].
    pub fn stop(&mut self) {
        let Some(started) = self.started.take() else {
            panic!("Timer::stop called without a matching Timer::start");
        };
        self.last = started.elapsed();
    }

    pub fn elapsed(&self) -> Duration {
        self.last
    }

    pub fn seconds(&self) -> f64 {
        self.last.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_timer_reads_zero() {
        let t = Timer::new();
        assert_eq!(t.seconds(), 0.0);
    }

    #[test]
    fn start_stop_measures_bracket() {
        let mut t = Timer::new();
        t.start();
        std::thread::sleep(Duration::from_millis(2));
        t.stop();
        assert!(t.elapsed() >= Duration::from_millis(2));
    }

    #[test]
    fn seconds_reflects_latest_bracket_only() {
        let mut t = Timer::new();
        t.start();
        std::thread::sleep(Duration::from_millis(5));
        t.stop();
        let first = t.elapsed();
        t.start();
        t.stop();
        assert!(t.elapsed() < first);
    }

    #[test]
    #[should_panic(expected = "without a matching Timer::start")]
    fn stop_without_start_panics() {
        Timer::new().stop();
    }
}
