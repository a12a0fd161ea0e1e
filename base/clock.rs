//! Clock interface and implementations for testability.
//!
//! A `Recording` embeds exactly one `Clocks` handle; every `DeviceReader` and
//! the capture pipeline itself consult it for `t_ms` stamps, so swapping in
//! `SimulatedClocks` makes capture-pipeline tests deterministic.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Abstract interface to the system clocks.
pub trait Clocks: Send + Sync + 'static {
    /// Current wall-clock time, for timestamps that end up in logs or the
    /// access log (not used for `t_ms`, which must never move backwards).
    fn realtime(&self) -> SystemTime;

    /// Current reading of a monotonic clock. Never affected by wall-clock
    /// adjustments; the only valid source for `t_ms`.
    fn monotonic(&self) -> Instant;

    /// Causes the current thread to sleep for the specified time.
    fn sleep(&self, how_long: Duration);

    /// Calls `rcv.recv_timeout` or substitutes a test implementation that
    /// advances the simulated clock instead of actually waiting.
    ///
    /// `where Self: Sized` keeps this generic method out of the vtable so
    /// `dyn Clocks` stays a valid trait object for the other methods; the
    /// few callers that need `recv_timeout` hold a concretely-typed clock.
    fn recv_timeout<T>(
        &self,
        rcv: &mpsc::Receiver<T>,
        timeout: Duration,
    ) -> Result<T, mpsc::RecvTimeoutError>
    where
        Self: Sized;
}

/// Milliseconds elapsed between two monotonic readings, as a non-negative
/// `t_ms` suitable for persistence.
pub fn elapsed_ms(start: Instant, now: Instant) -> i64 {
    now.saturating_duration_since(start).as_millis() as i64
}

#[derive(Copy, Clone, Default)]
pub struct RealClocks;

impl Clocks for RealClocks {
    fn realtime(&self) -> SystemTime {
        SystemTime::now()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, how_long: Duration) {
        thread::sleep(how_long);
    }

    fn recv_timeout<T>(
        &self,
        rcv: &mpsc::Receiver<T>,
        timeout: Duration,
    ) -> Result<T, mpsc::RecvTimeoutError> {
        rcv.recv_timeout(timeout)
    }
}

/// Simulated clock for deterministic tests: time only moves when `sleep` (or
/// a timed-out `recv_timeout`) is called.
#[derive(Clone)]
pub struct SimulatedClocks(Arc<SimulatedClocksInner>);

struct SimulatedClocksInner {
    boot_real: SystemTime,
    boot_mono: Instant,
    uptime: Mutex<Duration>,
}

impl SimulatedClocks {
    pub fn new() -> Self {
        SimulatedClocks(Arc::new(SimulatedClocksInner {
            boot_real: UNIX_EPOCH,
            boot_mono: Instant::now(),
            uptime: Mutex::new(Duration::ZERO),
        }))
    }
}

impl Default for SimulatedClocks {
    fn default() -> Self {
        Self::new()
    }
}

impl Clocks for SimulatedClocks {
    fn realtime(&self) -> SystemTime {
        self.0.boot_real + *self.0.uptime.lock().unwrap()
    }

    fn monotonic(&self) -> Instant {
        self.0.boot_mono + *self.0.uptime.lock().unwrap()
    }

    fn sleep(&self, how_long: Duration) {
        let mut l = self.0.uptime.lock().unwrap();
        *l += how_long;
    }

    fn recv_timeout<T>(
        &self,
        rcv: &mpsc::Receiver<T>,
        timeout: Duration,
    ) -> Result<T, mpsc::RecvTimeoutError> {
        let r = rcv.recv_timeout(Duration::from_secs(0));
        if r.is_err() {
            self.sleep(timeout);
        }
        r
    }
}

/// Logs a warning if the guarded operation takes a suspiciously long time.
pub struct TimerGuard<'a, C: Clocks + ?Sized, S: AsRef<str>, F: FnOnce() -> S + 'a> {
    clocks: &'a C,
    label_f: Option<F>,
    start: Instant,
}

impl<'a, C: Clocks + ?Sized, S: AsRef<str>, F: FnOnce() -> S + 'a> TimerGuard<'a, C, S, F> {
    pub fn new(clocks: &'a C, label_f: F) -> Self {
        TimerGuard {
            clocks,
            label_f: Some(label_f),
            start: clocks.monotonic(),
        }
    }
}

impl<'a, C, S, F> Drop for TimerGuard<'a, C, S, F>
where
    C: Clocks + ?Sized,
    S: AsRef<str>,
    F: FnOnce() -> S + 'a,
{
    fn drop(&mut self) {
        let elapsed = self.clocks.monotonic().saturating_duration_since(self.start);
        if elapsed >= Duration::from_secs(1) {
            let label_f = self.label_f.take().unwrap();
            warn!("{} took {:?}!", label_f().as_ref(), elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn simulated_clock_advances_only_on_sleep() {
        let c = SimulatedClocks::new();
        let t0 = c.monotonic();
        assert_eq!(elapsed_ms(t0, c.monotonic()), 0);
        c.sleep(Duration::from_millis(250));
        assert_eq!(elapsed_ms(t0, c.monotonic()), 250);
    }

    #[test]
    fn recv_timeout_advances_clock_on_timeout() {
        let c = SimulatedClocks::new();
        let (_tx, rx) = mpsc::channel::<()>();
        let t0 = c.monotonic();
        let r = c.recv_timeout(&rx, Duration::from_millis(500));
        assert!(r.is_err());
        assert_eq!(elapsed_ms(t0, c.monotonic()), 500);
    }
}
