//! Propagates a graceful-stop signal from `CapturePipeline::stop()` to each
//! reader thread.
//!
//! The capture pipeline is purely synchronous (no async runtime anywhere in
//! this crate), so this only needs a condvar-backed flag readers can poll at
//! their next event boundary or block on with a bound.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Debug)]
pub struct ShutdownError;

impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("shutdown requested")
    }
}

impl std::error::Error for ShutdownError {}

struct Inner {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

pub struct Sender(Arc<Inner>);

impl Sender {
    /// Requests shutdown. Idempotent; also happens implicitly on drop.
    pub fn send(&self) {
        *self.0.stopped.lock().unwrap() = true;
        self.0.condvar.notify_all();
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.send();
    }
}

#[derive(Clone)]
pub struct Receiver(Arc<Inner>);

impl Receiver {
    /// Non-blocking check; used at each reader loop iteration boundary.
    pub fn check(&self) -> Result<(), ShutdownError> {
        if *self.0.stopped.lock().unwrap() {
            Err(ShutdownError)
        } else {
            Ok(())
        }
    }

    /// Blocks until shutdown is requested or `timeout` elapses. Returns `Ok`
    /// on timeout (no shutdown yet), `Err` once shutdown has fired.
    pub fn wait_for(&self, timeout: Duration) -> Result<(), ShutdownError> {
        let l = self.0.stopped.lock().unwrap();
        let (l, result) = self
            .0
            .condvar
            .wait_timeout_while(l, timeout, |stopped| !*stopped)
            .unwrap();
        drop(l);
        if result.timed_out() {
            Ok(())
        } else {
            Err(ShutdownError)
        }
    }
}

/// Returns a sender and receiver for graceful shutdown. Dropping the sender
/// requests shutdown.
pub fn channel() -> (Sender, Receiver) {
    let inner = Arc::new(Inner {
        stopped: Mutex::new(false),
        condvar: Condvar::new(),
    });
    (Sender(inner.clone()), Receiver(inner))
}

#[cfg(test)]
mod tests {
    #[test]
    fn simple_check() {
        let (tx, rx) = super::channel();
        rx.check().unwrap();
        drop(tx);
        rx.check().unwrap_err();
    }

    #[test]
    fn blocking() {
        let (tx, rx) = super::channel();
        rx.wait_for(std::time::Duration::from_secs(0)).unwrap();
        let h = std::thread::spawn(move || {
            rx.wait_for(std::time::Duration::from_secs(1000))
                .unwrap_err()
        });
        std::thread::sleep(std::time::Duration::from_millis(10));
        drop(tx);
        h.join().unwrap();
    }
}
