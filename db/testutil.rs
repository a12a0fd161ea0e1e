//! Shared test fixtures for the persistence layer and, via `db::testutil`,
//! for crates built on top of it (capture pipeline, analysis, export).

use crate::{auth, CalibrationData, EventKind, NewEvent, Store};
use uuid::Uuid;

/// An in-memory `Store` with cheap PIN-hashing parameters, so test suites
/// that create many studies don't pay real scrypt cost.
pub fn test_store() -> Store {
    auth::set_test_params();
    Store::open_in_memory().expect("in-memory store opens")
}

/// Creates a study/recording/session/stream chain and returns their ids, for
/// tests that only care about appending events to a valid stream.
pub fn fixture_stream(store: &Store, calibration: Option<&CalibrationData>) -> (Uuid, Uuid, Uuid, Uuid) {
    let study_id = store
        .create_study("fixture-study", "1234", None, None)
        .expect("create_study");
    let recording_id = store
        .create_recording(study_id, "/tmp/fixture.mp4", None)
        .expect("create_recording");
    let session_id = store
        .create_session(recording_id, Some("fixture session"), false)
        .expect("create_session");
    let stream_id = store
        .create_stream(session_id, "fixture-pad0", None, Some("P1"), calibration)
        .expect("create_stream");
    (study_id, recording_id, session_id, stream_id)
}

/// Appends an axis event at `t_ms` with `value`, panicking on failure.
pub fn append_axis(store: &Store, ids: (Uuid, Uuid, Uuid), t_ms: i64, code: &str, value: i32) {
    let (recording_id, session_id, stream_id) = ids;
    store
        .append_event(&NewEvent {
            recording_id,
            session_id,
            stream_id,
            t_ms,
            kind: EventKind::Axis,
            code: code.to_string(),
            value: Some(value),
            is_press: None,
        })
        .expect("append_event");
}

/// Appends a button event (press, release, or ambiguous repeat) at `t_ms`.
pub fn append_button(store: &Store, ids: (Uuid, Uuid, Uuid), t_ms: i64, code: &str, is_press: Option<bool>) {
    let (recording_id, session_id, stream_id) = ids;
    store
        .append_event(&NewEvent {
            recording_id,
            session_id,
            stream_id,
            t_ms,
            kind: EventKind::Button,
            code: code.to_string(),
            value: Some(is_press.map(|p| p as i32).unwrap_or(2)),
            is_press,
        })
        .expect("append_event");
}
