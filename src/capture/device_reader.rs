//! Decodes one physical controller's raw events into `db::NewEvent`s and
//! appends them to the `Store`, one thread per device.
//!
//! The classify/map/filter/normalize/stamp pipeline is split out as
//! [`DeviceReader::process_raw`], a pure function over a [`RawEvent`], so
//! it's unit-testable without a real device. The thread loop itself
//! (`DeviceReader::run`) is a thin driver around it and an injected
//! [`RawEventSource`], keeping the pure logic separate from thread plumbing
//! the same way `base::clock`'s `Clocks` trait separates time from threads.

use base::{err, Error, ErrorKind};
use db::{CalibrationData, EventKind, NewEvent, Store};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The three raw event classes a physical controller can emit, mirroring
/// `evdev`'s `EV_SYN` / `EV_ABS` / `EV_KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// Synchronization/miscellaneous housekeeping event; always skipped.
    Sync,
    Abs,
    Key,
}

/// One decoded-but-not-yet-symbolic raw device event: a numeric code and
/// value, still in the device driver's own numbering.
#[derive(Debug, Clone, Copy)]
pub struct RawEvent {
    pub kind: RawKind,
    pub code: u16,
    pub value: i32,
}

/// Source of raw device events, abstracting over a real character device so
/// `DeviceReader` can be driven by a fixed event sequence in tests. `next`
/// blocks until an event is available, returns `Ok(None)` on a clean EOF
/// (device unplugged), and `Err` on any other I/O failure.
pub trait RawEventSource: Send {
    fn next(&mut self) -> Result<Option<RawEvent>, Error>;
}

/// Maps a raw `EV_ABS`/`EV_KEY` numeric code to a stable symbolic name.
/// Matches `gamepad.py`'s `_code_name_abs`/`_code_name_key`: real
/// `evdev`-style code tables are consulted through [`AbsCodec`]/[`KeyCodec`]
/// implementations; anything unrecognized falls back to `ABS_<n>`/`KEY_<n>`
/// so capture never drops an event merely because the hardware reports an
/// unfamiliar code.
pub trait CodeNamer: Send {
    fn name_abs(&self, code: u16) -> String;
    fn name_key(&self, code: u16) -> String;
}

/// `CodeNamer` over `evdev`'s own symbolic constant tables. The real
/// capture backend on Linux.
#[cfg(target_os = "linux")]
pub struct EvdevCodeNamer;

#[cfg(target_os = "linux")]
impl CodeNamer for EvdevCodeNamer {
    fn name_abs(&self, code: u16) -> String {
        evdev::AbsoluteAxisCode(code)
            .0
            .checked_sub(0)
            .map(|_| format!("{:?}", evdev::AbsoluteAxisCode(code)))
            .unwrap_or_else(|| format!("ABS_{code}"))
    }

    fn name_key(&self, code: u16) -> String {
        format!("{:?}", evdev::KeyCode(code))
    }
}

/// `RawEventSource` reading from a real Linux evdev character device.
#[cfg(target_os = "linux")]
pub struct EvdevSource {
    device: evdev::Device,
}

#[cfg(target_os = "linux")]
impl EvdevSource {
    pub fn open(path: &std::path::Path) -> Result<Self, Error> {
        let device = evdev::Device::open(path)
            .map_err(|e| err!(Unavailable, "failed to open device {}: {e}", path.display()))?;
        Ok(EvdevSource { device })
    }
}

#[cfg(target_os = "linux")]
impl RawEventSource for EvdevSource {
    fn next(&mut self) -> Result<Option<RawEvent>, Error> {
        use evdev::EventSummary;
        loop {
            let events = match self.device.fetch_events() {
                Ok(events) => events,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(err!(Unavailable, "device read failed: {e}")),
            };
            for ev in events {
                match ev.destructure() {
                    EventSummary::AbsAxis(_, code, value) => {
                        return Ok(Some(RawEvent {
                            kind: RawKind::Abs,
                            code: code.0,
                            value,
                        }))
                    }
                    EventSummary::Key(_, code, value) => {
                        return Ok(Some(RawEvent {
                            kind: RawKind::Key,
                            code: code.0,
                            value,
                        }))
                    }
                    _ => continue, // EV_SYN and other housekeeping.
                }
            }
        }
    }
}

/// State machine: `Opened -> Running -> Stopping -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReaderState {
    Opened = 0,
    Running = 1,
    Stopping = 2,
    Closed = 3,
}

/// Decodes and persists one device's events.
/// [`process_raw`](Self::process_raw) implements the classify/name/filter/
/// normalize steps as a pure function; [`run`](Self::run) drives it against
/// a live source.
pub struct DeviceReader {
    pub stream_id: Uuid,
    recording_id: Uuid,
    session_id: Uuid,
    alias: String,
    calibration: Option<CalibrationData>,
    allowed_inputs: Option<Vec<String>>,
    state: std::sync::atomic::AtomicU8,
}

impl DeviceReader {
    pub fn new(
        recording_id: Uuid,
        session_id: Uuid,
        stream_id: Uuid,
        alias: impl Into<String>,
        calibration: Option<CalibrationData>,
        allowed_inputs: Option<Vec<String>>,
    ) -> Self {
        DeviceReader {
            stream_id,
            recording_id,
            session_id,
            alias: alias.into(),
            calibration,
            allowed_inputs,
            state: std::sync::atomic::AtomicU8::new(ReaderState::Opened as u8),
        }
    }

    pub fn state(&self) -> ReaderState {
        match self.state.load(std::sync::atomic::Ordering::Acquire) {
            0 => ReaderState::Opened,
            1 => ReaderState::Running,
            2 => ReaderState::Stopping,
            _ => ReaderState::Closed,
        }
    }

    fn set_state(&self, s: ReaderState) {
        self.state.store(s as u8, std::sync::atomic::Ordering::Release);
    }

    /// Classifies, names, filters, and normalizes one raw event. Returns
    /// `None` if the event should be dropped (a sync event, or filtered by
    /// the allow-list). Does not stamp `t_ms` or touch the Store;
    /// [`run`](Self::run) does that.
    pub fn process_raw(&self, raw: &RawEvent, namer: &dyn CodeNamer) -> Option<(EventKind, String, Option<i32>, Option<bool>)> {
        match raw.kind {
            RawKind::Sync => None,
            RawKind::Abs => {
                let code = namer.name_abs(raw.code);
                if !self.is_allowed(&code) {
                    return None;
                }
                let value = match self.calibration.as_ref().and_then(|c| c.axes.get(&code)) {
                    Some(axis) => (axis.normalize(raw.value) * 1000.0).round().clamp(-1000.0, 1000.0) as i32,
                    None => raw.value,
                };
                Some((EventKind::Axis, code, Some(value), None))
            }
            RawKind::Key => {
                let code = namer.name_key(raw.code);
                if !self.is_allowed(&code) {
                    return None;
                }
                let is_press = match raw.value {
                    1 => Some(true),
                    0 => Some(false),
                    _ => None, // hardware repeat: ambiguous press/release.
                };
                Some((EventKind::Button, code, Some(raw.value), is_press))
            }
        }
    }

    fn is_allowed(&self, code: &str) -> bool {
        match &self.allowed_inputs {
            None => true,
            Some(allow) => allow.iter().any(|c| c == code),
        }
    }

    /// Drives `source` until it stops (EOF, shutdown signal, or I/O error),
    /// appending each surviving decoded event via `store`. Any I/O error on
    /// the device closes the reader; other readers are unaffected since each
    /// owns its own device handle.
    pub fn run(
        &self,
        mut source: Box<dyn RawEventSource>,
        namer: &dyn CodeNamer,
        clocks: &Arc<dyn base::Clocks>,
        store: &Store,
        stop: base::shutdown::Receiver,
    ) -> Result<(), Error> {
        info!(stream_id = %self.stream_id, alias = %self.alias, "device reader started");
        self.set_state(ReaderState::Running);
        let start = clocks.monotonic();
        let result = loop {
            if stop.check().is_err() {
                self.set_state(ReaderState::Stopping);
                break Ok(());
            }
            let raw = match source.next() {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    debug!(stream_id = %self.stream_id, "device closed (EOF)");
                    break Ok(());
                }
                Err(e) => {
                    warn!(stream_id = %self.stream_id, err = %e, "device lost");
                    break Err(err!(Unavailable, "device lost for stream {}: {e}", self.stream_id));
                }
            };
            let Some((kind, code, value, is_press)) = self.process_raw(&raw, namer) else {
                continue;
            };
            let t_ms = base::clock::elapsed_ms(start, clocks.monotonic());
            let event = NewEvent {
                recording_id: self.recording_id,
                session_id: self.session_id,
                stream_id: self.stream_id,
                t_ms,
                kind,
                code,
                value,
                is_press,
            };
            if let Err(e) = store.append_event(&event) {
                break Err(err!(Internal, "store write failed for stream {}: {e}", self.stream_id));
            }
        };
        self.set_state(ReaderState::Closed);
        result
    }
}

/// Bounded join timeout for `CapturePipeline::stop`.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// No-op `CodeNamer` used in unit tests and on non-Linux targets where no
/// real device backend is wired up; maps codes to their `ABS_n`/`KEY_n`
/// fallback form directly, matching `gamepad.py`'s own fallback path.
pub struct FallbackCodeNamer;

impl CodeNamer for FallbackCodeNamer {
    fn name_abs(&self, code: u16) -> String {
        format!("ABS_{code}")
    }

    fn name_key(&self, code: u16) -> String {
        format!("KEY_{code}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::CalibrationAxis;

    fn reader() -> DeviceReader {
        DeviceReader::new(Uuid::nil(), Uuid::nil(), Uuid::nil(), "P1", None, None)
    }

    #[test]
    fn sync_events_are_dropped() {
        let r = reader();
        let raw = RawEvent {
            kind: RawKind::Sync,
            code: 0,
            value: 0,
        };
        assert!(r.process_raw(&raw, &FallbackCodeNamer).is_none());
    }

    #[test]
    fn axis_without_calibration_stores_raw_value() {
        let r = reader();
        let raw = RawEvent {
            kind: RawKind::Abs,
            code: 0,
            value: 12345,
        };
        let (kind, code, value, is_press) = r.process_raw(&raw, &FallbackCodeNamer).unwrap();
        assert_eq!(kind, EventKind::Axis);
        assert_eq!(code, "ABS_0");
        assert_eq!(value, Some(12345));
        assert_eq!(is_press, None);
    }

    #[test]
    fn axis_with_calibration_normalizes_into_plus_minus_1000() {
        let mut cal = CalibrationData::default();
        cal.axes.insert("ABS_0".to_string(), CalibrationAxis::new(0, 255));
        let r = DeviceReader::new(Uuid::nil(), Uuid::nil(), Uuid::nil(), "P1", Some(cal), None);

        let min_raw = RawEvent { kind: RawKind::Abs, code: 0, value: 0 };
        let max_raw = RawEvent { kind: RawKind::Abs, code: 0, value: 255 };
        let mid_raw = RawEvent { kind: RawKind::Abs, code: 0, value: 128 };

        assert_eq!(r.process_raw(&min_raw, &FallbackCodeNamer).unwrap().2, Some(-1000));
        assert_eq!(r.process_raw(&max_raw, &FallbackCodeNamer).unwrap().2, Some(1000));
        let mid = r.process_raw(&mid_raw, &FallbackCodeNamer).unwrap().2.unwrap();
        assert!((mid - 4).abs() <= 8, "mid={mid}");
    }

    #[test]
    fn allowed_inputs_filters_unlisted_codes() {
        let r = DeviceReader::new(
            Uuid::nil(),
            Uuid::nil(),
            Uuid::nil(),
            "P1",
            None,
            Some(vec!["ABS_0".to_string()]),
        );
        let allowed = RawEvent { kind: RawKind::Abs, code: 0, value: 1 };
        let filtered = RawEvent { kind: RawKind::Abs, code: 1, value: 1 };
        assert!(r.process_raw(&allowed, &FallbackCodeNamer).is_some());
        assert!(r.process_raw(&filtered, &FallbackCodeNamer).is_none());
    }

    #[test]
    fn button_value_two_is_ambiguous_repeat() {
        let r = reader();
        let raw = RawEvent { kind: RawKind::Key, code: 0, value: 2 };
        let (_, _, value, is_press) = r.process_raw(&raw, &FallbackCodeNamer).unwrap();
        assert_eq!(value, Some(2));
        assert_eq!(is_press, None);
    }

    struct FixedSource(std::vec::IntoIter<RawEvent>);

    impl RawEventSource for FixedSource {
        fn next(&mut self) -> Result<Option<RawEvent>, Error> {
            Ok(self.0.next())
        }
    }

    #[test]
    fn run_appends_every_surviving_event_and_stops_at_eof() {
        let store = db::testutil::test_store();
        let (study_id, _, _, _) = db::testutil::fixture_stream(&store, None);
        let study = store.get_study_by_label("fixture-study").unwrap();
        assert_eq!(study.id, study_id);
        let recording_id = store.list_recordings(study_id).unwrap()[0].id;
        let session_id = store.list_sessions(recording_id).unwrap()[0].id;
        let stream_id = store.list_streams(session_id).unwrap()[0].id;

        let reader = DeviceReader::new(recording_id, session_id, stream_id, "P1", None, None);
        let events = vec![
            RawEvent { kind: RawKind::Sync, code: 0, value: 0 },
            RawEvent { kind: RawKind::Abs, code: 0, value: 10 },
            RawEvent { kind: RawKind::Key, code: 0, value: 1 },
        ];
        let source = Box::new(FixedSource(events.into_iter()));
        let clocks: Arc<dyn base::Clocks> = Arc::new(base::SimulatedClocks::new());
        let (_tx, rx) = base::shutdown::channel();
        reader
            .run(source, &FallbackCodeNamer, &clocks, &store, rx)
            .unwrap();

        let persisted = store.scan_events(&[stream_id], None).unwrap();
        // INIT marker + the 2 non-sync events.
        assert_eq!(persisted.len(), 3);
    }
}
