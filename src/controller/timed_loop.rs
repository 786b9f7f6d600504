use std::time::{Duration, Instant};

/// Shortest iteration the loops are allowed to run
pub const MIN_LOOP_INTERVAL: Duration = Duration::from_millis(1);

/// Drives a callback repeatedly with the elapsed time since the last iteration.
///
/// Iterations shorter than `min_interval` are padded with a sleep so the
/// reported timestep never drops below it. This keeps near-zero timesteps out
/// of the integration code and caps the iteration rate at the same time.
#[derive(Debug, Clone, Copy)]
pub struct TimedLoop {
    min_interval: Duration,
}

impl Default for TimedLoop {
    fn default() -> Self {
        Self::new(MIN_LOOP_INTERVAL)
    }
}

impl TimedLoop {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `body` while `should_continue` holds, returning the iteration count.
    ///
    /// `body` receives the timestep in seconds and runs on the calling thread.
    pub fn run<C, F>(&self, mut should_continue: C, mut body: F) -> u64
    where
        C: FnMut() -> bool,
        F: FnMut(f32),
    {
        let mut iterations = 0;
        let mut last = Instant::now();

        while should_continue() {
            let now = Instant::now();
            let mut elapsed = now - last;

            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
                elapsed = self.min_interval;
            }

            body(elapsed.as_secs_f32());
            last = now;
            iterations += 1;
        }

        iterations
    }
}
