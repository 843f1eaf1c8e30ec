//! Write-once termination flag shared by every loop.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative stop signal.
///
/// Starts lowered and can only be raised, once. Loops poll
/// [`is_raised`](Halt::is_raised) between bursts; paced loops sleep through
/// [`sleep_until`](Halt::sleep_until), which returns as soon as the flag goes
/// up instead of waiting out the deadline.
#[derive(Debug, Default)]
pub struct Halt {
    raised: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl Halt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Raises the flag and wakes every paced sleeper. Returns `true` only for
    /// the call that actually raised it.
    pub fn raise(&self) -> bool {
        if self.raised.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _guard = self.lock.lock();
        self.wake.notify_all();
        true
    }

    /// Sleeps until `deadline` or until the flag is raised, whichever comes
    /// first. Returns whether the flag is raised.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        let mut guard = self.lock.lock();
        while !self.is_raised() {
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                return self.is_raised();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn sleep_for(halt: &Halt, duration: Duration) -> bool {
        halt.sleep_until(Instant::now() + duration)
    }

    #[test]
    fn test_raise_is_write_once() {
        let halt = Halt::new();
        assert!(!halt.is_raised());
        assert!(halt.raise());
        assert!(halt.is_raised());
        assert!(!halt.raise());
        assert!(halt.is_raised());
    }

    #[test]
    fn test_sleep_runs_to_deadline_when_lowered() {
        let halt = Halt::new();
        let start = Instant::now();
        assert!(!sleep_for(&halt, Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_raise_cuts_sleep_short() {
        let halt = Arc::new(Halt::new());
        let sleeper = {
            let halt = halt.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let raised = sleep_for(&halt, Duration::from_secs(30));
                (raised, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        halt.raise();
        let (raised, slept) = sleeper.join().unwrap();
        assert!(raised);
        assert!(slept < Duration::from_secs(5));
    }

    #[test]
    fn test_sleep_after_raise_returns_immediately() {
        let halt = Halt::new();
        halt.raise();
        let start = Instant::now();
        assert!(sleep_for(&halt, Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
