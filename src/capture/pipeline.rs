//! Spawns and supervises one [`DeviceReader`] thread per assigned input
//! device for the duration of a recording: one thread per assigned device
//! path, joined with a bounded timeout on shutdown.

use crate::capture::device_reader::{CodeNamer, DeviceReader, RawEventSource, JOIN_TIMEOUT};
use base::{err, shutdown, Clocks, Error};
use db::{CalibrationData, Store};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// One physical device assigned to a recording: its stream id (already
/// created via `Store::create_stream`), participant alias, and calibration.
pub struct DeviceAssignment {
    pub device_path: PathBuf,
    pub stream_id: Uuid,
    pub alias: String,
    pub calibration: Option<CalibrationData>,
    pub allowed_inputs: Option<Vec<String>>,
}

/// Constructs a real evdev-backed `RawEventSource` for `path`, and the
/// `CodeNamer` to decode it with. Exists so `CapturePipeline` doesn't need
/// `#[cfg(target_os = "linux")]` sprinkled through its own body.
#[cfg(target_os = "linux")]
fn open_source(path: &std::path::Path) -> Result<(Box<dyn RawEventSource>, Box<dyn CodeNamer>), Error> {
    use crate::capture::device_reader::{EvdevCodeNamer, EvdevSource};
    Ok((Box::new(EvdevSource::open(path)?), Box::new(EvdevCodeNamer)))
}

#[cfg(not(target_os = "linux"))]
fn open_source(path: &std::path::Path) -> Result<(Box<dyn RawEventSource>, Box<dyn CodeNamer>), Error> {
    Err(err!(
        Unavailable,
        "no device capture backend on this platform for {}",
        path.display()
    ))
}

/// Runs one `DeviceReader` per assigned device concurrently for the life of
/// a recording. `start` spawns threads and returns immediately; `stop`
/// signals shutdown and joins every thread with a bounded timeout, so one
/// wedged device can't hang the whole recording.
pub struct CapturePipeline {
    handles: Vec<(Uuid, JoinHandle<Result<(), Error>>)>,
    shutdown_tx: Option<shutdown::Sender>,
}

impl CapturePipeline {
    /// Starts one reader thread per entry in `assignments`. Devices that
    /// fail to open are logged and skipped rather than aborting the whole
    /// recording, so one unplugged pad doesn't block capture for the rest.
    pub fn start(
        recording_id: Uuid,
        session_id: Uuid,
        assignments: Vec<DeviceAssignment>,
        clocks: Arc<dyn Clocks>,
        store: Arc<Store>,
    ) -> Self {
        let (tx, rx) = shutdown::channel();
        let mut handles = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            let stream_id = assignment.stream_id;
            let (source, namer) = match open_source(&assignment.device_path) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(
                        device = %assignment.device_path.display(),
                        err = %e,
                        "skipping device that failed to open"
                    );
                    continue;
                }
            };
            let reader = DeviceReader::new(
                recording_id,
                session_id,
                stream_id,
                assignment.alias,
                assignment.calibration,
                assignment.allowed_inputs,
            );
            let clocks = Arc::clone(&clocks);
            let store = Arc::clone(&store);
            let rx = rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("hsparc-capture-{stream_id}"))
                .spawn(move || reader.run(source, namer.as_ref(), &clocks, &store, rx))
                .expect("spawning a capture thread");
            handles.push((stream_id, handle));
        }

        info!(count = handles.len(), "capture pipeline started");
        CapturePipeline {
            handles,
            shutdown_tx: Some(tx),
        }
    }

    /// Signals every reader to stop and joins them with a bounded timeout.
    /// A thread still running past `JOIN_TIMEOUT` is logged as leaked and
    /// its handle is dropped rather than blocking `stop()` forever; the
    /// pipeline still transitions to closed. Returns per-stream errors for
    /// any thread that failed rather than the first one, so a crashed/
    /// wedged device doesn't hide failures on the others.
    pub fn stop(mut self) -> BTreeMap<Uuid, Result<(), Error>> {
        drop(self.shutdown_tx.take());
        let mut results = BTreeMap::new();
        for (stream_id, handle) in self.handles.drain(..) {
            let deadline = std::time::Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && std::time::Instant::now() < deadline {
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            if !handle.is_finished() {
                warn!(%stream_id, "capture thread did not stop within the join timeout; leaking it");
                results.insert(
                    stream_id,
                    Err(err!(Internal, "capture thread for stream {stream_id} did not join in time")),
                );
                continue;
            }
            let outcome = match handle.join() {
                Ok(result) => result,
                Err(_) => Err(err!(Internal, "capture thread for stream {stream_id} panicked")),
            };
            results.insert(stream_id, outcome);
        }
        results
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            drop(tx);
            for (stream_id, handle) in self.handles.drain(..) {
                let deadline = std::time::Instant::now() + JOIN_TIMEOUT;
                while !handle.is_finished() && std::time::Instant::now() < deadline {
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
                if !handle.is_finished() {
                    warn!(%stream_id, "dropping capture pipeline with reader still running; leaking it");
                    continue;
                }
                let _ = handle.join();
            }
        }
    }
}

/// Join timeout exposed for callers (e.g. `cmds::record`) that want to
/// report a slow shutdown rather than block forever.
pub const STOP_TIMEOUT: std::time::Duration = JOIN_TIMEOUT;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::device_reader::RawEvent;

    struct EmptySource;
    impl RawEventSource for EmptySource {
        fn next(&mut self) -> Result<Option<RawEvent>, Error> {
            Ok(None)
        }
    }

    #[test]
    fn stop_joins_all_threads_and_reports_per_stream() {
        // No real devices available in a test environment: this exercises
        // only the empty-assignment path, confirming start/stop is safe
        // with nothing to supervise.
        let store = Arc::new(db::testutil::test_store());
        let clocks: Arc<dyn Clocks> = Arc::new(base::SimulatedClocks::new());
        let pipeline = CapturePipeline::start(Uuid::nil(), Uuid::nil(), vec![], clocks, store);
        let results = pipeline.stop();
        assert!(results.is_empty());
    }
}
