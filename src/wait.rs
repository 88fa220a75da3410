use std::thread;
use std::time::Duration;

/// Source of the pause between two polls. Tests substitute a recording fake.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { checks: u32 },
    TimedOut { checks: u32 },
}

/// Fixed-interval retry with an upper bound on the number of checks.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub interval: Duration,
    pub max_checks: u32,
}

impl Poller {
    /// Poller that waits up to `max_wait_secs` one-second intervals. The
    /// condition is checked before each sleep and once more after the last
    /// one, so it runs `max_wait_secs + 1` times.
    pub fn per_second(max_wait_secs: u32) -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_checks: max_wait_secs.saturating_add(1),
        }
    }

    pub fn run<F>(&self, sleeper: &dyn Sleeper, mut ready: F) -> PollOutcome
    where
        F: FnMut() -> bool,
    {
        let mut checks = 0u32;
        loop {
            checks += 1;
            if ready() {
                return PollOutcome::Ready { checks };
            }
            if checks >= self.max_checks {
                return PollOutcome::TimedOut { checks };
            }
            sleeper.sleep(self.interval);
        }
    }

    /// Like [`Poller::run`] but for probes that may fail; the first error stops polling.
    pub fn try_run<T, E, F>(&self, sleeper: &dyn Sleeper, mut probe: F) -> Result<Option<T>, E>
    where
        F: FnMut() -> Result<Option<T>, E>,
    {
        let mut checks = 0u32;
        loop {
            checks += 1;
            if let Some(value) = probe()? {
                return Ok(Some(value));
            }
            if checks >= self.max_checks {
                return Ok(None);
            }
            sleeper.sleep(self.interval);
        }
    }
}
