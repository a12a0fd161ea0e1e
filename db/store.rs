//! Transactional persistence of Studies, Recordings, Sessions, Streams, and
//! Events.
//!
//! A single-writer logical discipline: every operation takes the connection
//! mutex for the duration of one transaction. SQLite's own write lock
//! backs this physically; readers (`scan_events`, `list_*`) see a
//! consistent snapshot because they also go through the same connection.

use crate::auth;
use crate::model::*;
use crate::raw::{SqlJson, SqlUuid};
use crate::upgrade;
use base::{bail, err, Error};
use rusqlite::{named_params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

pub struct Store {
    conn: Mutex<Connection>,
    clocks: std::sync::Arc<dyn base::Clocks>,
}

fn utc_now_iso() -> String {
    jiff::Timestamp::now().to_string()
}

impl Store {
    /// Opens (creating if needed) the SQLite database at `path`, applying
    /// any pending migrations.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut conn = Connection::open(path).map_err(|e| err!(Internal, "failed to open store.db: {e}"))?;
        Self::init_conn(&mut conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
            clocks: std::sync::Arc::new(base::RealClocks),
        })
    }

    /// Opens a private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, Error> {
        let mut conn =
            Connection::open_in_memory().map_err(|e| err!(Internal, "failed to open in-memory store: {e}"))?;
        Self::init_conn(&mut conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
            clocks: std::sync::Arc::new(base::RealClocks),
        })
    }

    /// Acquires the connection mutex, logging a warning if another thread
    /// held it long enough to make this wait suspicious. Mirrors the
    /// teacher's `Database::lock`, which wraps its own mutex acquisition in
    /// a `TimerGuard` the same way.
    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        let timer = base::clock::TimerGuard::new(self.clocks.as_ref(), || "store lock acquisition");
        let conn = self.conn.lock().unwrap();
        drop(timer);
        conn
    }

    fn init_conn(conn: &mut Connection) -> Result<(), Error> {
        conn.pragma_update(None, "journal_mode", "wal")
            .map_err(|e| err!(Internal, "failed to set journal_mode=wal: {e}"))?;
        conn.pragma_update(None, "foreign_keys", "on")
            .map_err(|e| err!(Internal, "failed to enable foreign keys: {e}"))?;
        upgrade::run(conn)
    }

    // ---- Study ----

    pub fn create_study(
        &self,
        label: &str,
        pin: &str,
        observer_instructions_text: Option<&str>,
        observer_instructions_image_path: Option<&str>,
    ) -> Result<Uuid, Error> {
        let conn = self.lock();
        let existing: Option<i64> = conn
            .query_row(
                "select 1 from study where label = ?",
                [label],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| err!(Internal, "failed to check study label: {e}"))?;
        if existing.is_some() {
            bail!(AlreadyExists, "study with label {label:?} already exists");
        }
        let id = Uuid::now_v7();
        let hash = auth::hash_pin(pin)?;
        conn.execute(
            "insert into study (id, label, created_utc, security_hash, is_locked, \
             observer_instructions_text, observer_instructions_image_path) \
             values (:id, :label, :created_utc, :security_hash, 1, :text, :image)",
            named_params! {
                ":id": SqlUuid(id),
                ":label": label,
                ":created_utc": utc_now_iso(),
                ":security_hash": hash,
                ":text": observer_instructions_text,
                ":image": observer_instructions_image_path,
            },
        )
        .map_err(|e| err!(Internal, "failed to insert study: {e}"))?;
        Ok(id)
    }

    fn row_to_study(row: &rusqlite::Row) -> rusqlite::Result<Study> {
        let id: SqlUuid = row.get("id")?;
        Ok(Study {
            id: id.0,
            label: row.get("label")?,
            created_utc: row.get("created_utc")?,
            security_hash: row.get("security_hash")?,
            is_locked: row.get::<_, i64>("is_locked")? != 0,
            observer_instructions_text: row.get("observer_instructions_text")?,
            observer_instructions_image_path: row.get("observer_instructions_image_path")?,
        })
    }

    pub fn get_study(&self, study_id: Uuid) -> Result<Study, Error> {
        let conn = self.lock();
        conn.query_row(
            "select id, label, created_utc, security_hash, is_locked, \
             observer_instructions_text, observer_instructions_image_path \
             from study where id = ?",
            [SqlUuid(study_id)],
            Self::row_to_study,
        )
        .optional()
        .map_err(|e| err!(Internal, "failed to load study: {e}"))?
        .ok_or_else(|| err!(NotFound, "no such study {study_id}"))
    }

    pub fn get_study_by_label(&self, label: &str) -> Result<Study, Error> {
        let conn = self.lock();
        conn.query_row(
            "select id, label, created_utc, security_hash, is_locked, \
             observer_instructions_text, observer_instructions_image_path \
             from study where label = ?",
            [label],
            Self::row_to_study,
        )
        .optional()
        .map_err(|e| err!(Internal, "failed to load study: {e}"))?
        .ok_or_else(|| err!(NotFound, "no such study {label:?}"))
    }

    pub fn list_studies(&self) -> Result<Vec<Study>, Error> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "select id, label, created_utc, security_hash, is_locked, \
                 observer_instructions_text, observer_instructions_image_path \
                 from study order by created_utc",
            )
            .map_err(|e| err!(Internal, "failed to prepare study list: {e}"))?;
        let rows = stmt
            .query_map([], Self::row_to_study)
            .map_err(|e| err!(Internal, "failed to list studies: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| err!(Internal, "failed to read study row: {e}"))
    }

    pub fn verify_study_pin(&self, study_id: Uuid, pin: &str) -> Result<bool, Error> {
        let study = self.get_study(study_id)?;
        auth::verify_pin(&study.security_hash, pin)
    }

    /// Deletes a study and everything under it. Cascades through the
    /// foreign-key chain (recording -> observer_session -> input_stream ->
    /// input_event) since `foreign_keys=on` alone wouldn't cascade deletes
    /// without `on delete cascade`, so it's done explicitly here in one
    /// transaction.
    pub fn delete_study(&self, study_id: Uuid) -> Result<(), Error> {
        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|e| err!(Internal, "failed to start delete transaction: {e}"))?;
        let id = SqlUuid(study_id);
        tx.execute(
            "delete from input_event where recording_id in (select id from recording where study_id = ?)",
            [&id],
        )
        .map_err(|e| err!(Internal, "failed to delete events: {e}"))?;
        tx.execute(
            "delete from input_stream where session_id in (\
               select s.id from observer_session s \
               join recording r on s.recording_id = r.id where r.study_id = ?)",
            [&id],
        )
        .map_err(|e| err!(Internal, "failed to delete streams: {e}"))?;
        tx.execute(
            "delete from observer_session where recording_id in (select id from recording where study_id = ?)",
            [&id],
        )
        .map_err(|e| err!(Internal, "failed to delete sessions: {e}"))?;
        tx.execute("delete from recording where study_id = ?", [&id])
            .map_err(|e| err!(Internal, "failed to delete recordings: {e}"))?;
        let n = tx
            .execute("delete from study where id = ?", [&id])
            .map_err(|e| err!(Internal, "failed to delete study: {e}"))?;
        if n == 0 {
            bail!(NotFound, "no such study {study_id}");
        }
        tx.commit()
            .map_err(|e| err!(Internal, "failed to commit study deletion: {e}"))
    }

    pub fn record_pin_attempt(
        &self,
        study_id_prefix: &str,
        action: &str,
        success: bool,
    ) -> Result<(), Error> {
        let conn = self.lock();
        conn.execute(
            "insert into pin_attempt (study_id_prefix, action, success, utc_iso) values (?, ?, ?, ?)",
            rusqlite::params![study_id_prefix, action, success as i64, utc_now_iso()],
        )
        .map_err(|e| err!(Internal, "failed to record pin attempt: {e}"))?;
        Ok(())
    }

    pub fn count_pin_failures(&self, study_id_prefix: &str, action: &str) -> Result<i64, Error> {
        let conn = self.lock();
        conn.query_row(
            "select count(*) from pin_attempt where study_id_prefix = ? and action = ? and success = 0",
            rusqlite::params![study_id_prefix, action],
            |row| row.get(0),
        )
        .map_err(|e| err!(Internal, "failed to count pin attempts: {e}"))
    }

    // ---- Recording ----

    pub fn create_recording(
        &self,
        study_id: Uuid,
        video_path: &str,
        notes: Option<&str>,
    ) -> Result<Uuid, Error> {
        let conn = self.lock();
        let id = Uuid::now_v7();
        conn.execute(
            "insert into recording (id, study_id, created_utc, video_path, notes) \
             values (:id, :study_id, :created_utc, :video_path, :notes)",
            named_params! {
                ":id": SqlUuid(id),
                ":study_id": SqlUuid(study_id),
                ":created_utc": utc_now_iso(),
                ":video_path": video_path,
                ":notes": notes,
            },
        )
        .map_err(|e| err!(Internal, "failed to insert recording: {e}"))?;
        Ok(id)
    }

    fn row_to_recording(row: &rusqlite::Row) -> rusqlite::Result<Recording> {
        let id: SqlUuid = row.get("id")?;
        let study_id: SqlUuid = row.get("study_id")?;
        Ok(Recording {
            id: id.0,
            study_id: study_id.0,
            created_utc: row.get("created_utc")?,
            video_path: row.get("video_path")?,
            notes: row.get("notes")?,
        })
    }

    pub fn get_recording(&self, recording_id: Uuid) -> Result<Recording, Error> {
        let conn = self.lock();
        conn.query_row(
            "select id, study_id, created_utc, video_path, notes from recording where id = ?",
            [SqlUuid(recording_id)],
            Self::row_to_recording,
        )
        .optional()
        .map_err(|e| err!(Internal, "failed to load recording: {e}"))?
        .ok_or_else(|| err!(NotFound, "no such recording {recording_id}"))
    }

    pub fn list_recordings(&self, study_id: Uuid) -> Result<Vec<Recording>, Error> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "select id, study_id, created_utc, video_path, notes from recording \
                 where study_id = ? order by created_utc",
            )
            .map_err(|e| err!(Internal, "failed to prepare recording list: {e}"))?;
        let rows = stmt
            .query_map([SqlUuid(study_id)], Self::row_to_recording)
            .map_err(|e| err!(Internal, "failed to list recordings: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| err!(Internal, "failed to read recording row: {e}"))
    }

    pub fn update_recording_video_path(&self, recording_id: Uuid, new_path: &str) -> Result<(), Error> {
        let conn = self.lock();
        let n = conn
            .execute(
                "update recording set video_path = ? where id = ?",
                rusqlite::params![new_path, SqlUuid(recording_id)],
            )
            .map_err(|e| err!(Internal, "failed to update video path: {e}"))?;
        if n == 0 {
            bail!(NotFound, "no such recording {recording_id}");
        }
        Ok(())
    }

    // ---- ObserverSession ----

    pub fn create_session(
        &self,
        recording_id: Uuid,
        label: Option<&str>,
        recognition_required: bool,
    ) -> Result<Uuid, Error> {
        let conn = self.lock();
        let id = Uuid::now_v7();
        conn.execute(
            "insert into observer_session \
             (id, recording_id, created_utc, label, recognition_check_required) \
             values (:id, :recording_id, :created_utc, :label, :req)",
            named_params! {
                ":id": SqlUuid(id),
                ":recording_id": SqlUuid(recording_id),
                ":created_utc": utc_now_iso(),
                ":label": label,
                ":req": recognition_required as i64,
            },
        )
        .map_err(|e| err!(Internal, "failed to insert session: {e}"))?;
        Ok(id)
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<ObserverSession> {
        let id: SqlUuid = row.get("id")?;
        let recording_id: SqlUuid = row.get("recording_id")?;
        Ok(ObserverSession {
            id: id.0,
            recording_id: recording_id.0,
            created_utc: row.get("created_utc")?,
            label: row.get("label")?,
            recognition_check_required: row.get::<_, i64>("recognition_check_required")? != 0,
            recognition_check_passed: row
                .get::<_, Option<i64>>("recognition_check_passed")?
                .map(|v| v != 0),
            recognition_check_timestamp: row.get("recognition_check_timestamp")?,
        })
    }

    pub fn list_sessions(&self, recording_id: Uuid) -> Result<Vec<ObserverSession>, Error> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "select id, recording_id, created_utc, label, recognition_check_required, \
                 recognition_check_passed, recognition_check_timestamp \
                 from observer_session where recording_id = ? order by created_utc",
            )
            .map_err(|e| err!(Internal, "failed to prepare session list: {e}"))?;
        let rows = stmt
            .query_map([SqlUuid(recording_id)], Self::row_to_session)
            .map_err(|e| err!(Internal, "failed to list sessions: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| err!(Internal, "failed to read session row: {e}"))
    }

    pub fn update_session_recognition(
        &self,
        session_id: Uuid,
        passed: bool,
        timestamp: &str,
    ) -> Result<(), Error> {
        let conn = self.lock();
        let n = conn
            .execute(
                "update observer_session set recognition_check_passed = ?, \
                 recognition_check_timestamp = ? where id = ?",
                rusqlite::params![passed as i64, timestamp, SqlUuid(session_id)],
            )
            .map_err(|e| err!(Internal, "failed to update recognition check: {e}"))?;
        if n == 0 {
            bail!(NotFound, "no such session {session_id}");
        }
        Ok(())
    }

    // ---- InputStream ----

    #[allow(clippy::too_many_arguments)]
    pub fn create_stream(
        &self,
        session_id: Uuid,
        device_name: &str,
        profile_id: Option<&str>,
        alias: Option<&str>,
        calibration: Option<&CalibrationData>,
    ) -> Result<Uuid, Error> {
        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|e| err!(Internal, "failed to start stream creation: {e}"))?;
        let id = Uuid::now_v7();
        let construct_mapping = calibration
            .map(CalibrationData::construct_mapping)
            .unwrap_or_default();
        let allowed_inputs = calibration.map(CalibrationData::allowed_inputs);
        tx.execute(
            "insert into input_stream \
             (id, session_id, device_name, profile_id, alias, construct_mapping, \
              calibration_data, allowed_inputs) \
             values (:id, :session_id, :device_name, :profile_id, :alias, :mapping, \
                     :calibration, :allowed)",
            named_params! {
                ":id": SqlUuid(id),
                ":session_id": SqlUuid(session_id),
                ":device_name": device_name,
                ":profile_id": profile_id,
                ":alias": alias,
                ":mapping": SqlJson(&construct_mapping),
                ":calibration": calibration.map(SqlJson),
                ":allowed": allowed_inputs.as_ref().map(SqlJson),
            },
        )
        .map_err(|e| err!(Internal, "failed to insert stream: {e}"))?;

        // Synthetic INIT marker, at t=0, preceding any live event on this stream.
        let recording_id = tx
            .query_row(
                "select r.id from recording r join observer_session s on s.recording_id = r.id \
                 where s.id = ?",
                [SqlUuid(session_id)],
                |row| row.get::<_, SqlUuid>(0),
            )
            .map_err(|e| err!(Internal, "failed to resolve recording for session: {e}"))?
            .0;
        tx.execute(
            "insert into input_event (recording_id, session_id, stream_id, t_ms, kind, code, value, is_press) \
             values (?, ?, ?, 0, 'init', '', null, null)",
            rusqlite::params![SqlUuid(recording_id), SqlUuid(session_id), SqlUuid(id)],
        )
        .map_err(|e| err!(Internal, "failed to insert INIT event: {e}"))?;

        tx.commit()
            .map_err(|e| err!(Internal, "failed to commit stream creation: {e}"))?;
        Ok(id)
    }

    fn row_to_stream(row: &rusqlite::Row) -> rusqlite::Result<InputStream> {
        let id: SqlUuid = row.get("id")?;
        let session_id: SqlUuid = row.get("session_id")?;
        let mapping: SqlJson<std::collections::BTreeMap<String, String>> = row.get("construct_mapping")?;
        let calibration: Option<SqlJson<CalibrationData>> = row.get("calibration_data")?;
        let allowed: Option<SqlJson<Vec<String>>> = row.get("allowed_inputs")?;
        Ok(InputStream {
            id: id.0,
            session_id: session_id.0,
            device_name: row.get("device_name")?,
            profile_id: row.get("profile_id")?,
            alias: row.get("alias")?,
            construct_mapping: mapping.0,
            calibration_data: calibration.map(|c| c.0),
            allowed_inputs: allowed.map(|a| a.0),
        })
    }

    pub fn get_stream(&self, stream_id: Uuid) -> Result<InputStream, Error> {
        let conn = self.lock();
        conn.query_row(
            "select id, session_id, device_name, profile_id, alias, construct_mapping, \
             calibration_data, allowed_inputs from input_stream where id = ?",
            [SqlUuid(stream_id)],
            Self::row_to_stream,
        )
        .optional()
        .map_err(|e| err!(Internal, "failed to load stream: {e}"))?
        .ok_or_else(|| err!(NotFound, "no such stream {stream_id}"))
    }

    pub fn list_streams(&self, session_id: Uuid) -> Result<Vec<InputStream>, Error> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "select id, session_id, device_name, profile_id, alias, construct_mapping, \
                 calibration_data, allowed_inputs from input_stream where session_id = ?",
            )
            .map_err(|e| err!(Internal, "failed to prepare stream list: {e}"))?;
        let rows = stmt
            .query_map([SqlUuid(session_id)], Self::row_to_stream)
            .map_err(|e| err!(Internal, "failed to list streams: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| err!(Internal, "failed to read stream row: {e}"))
    }

    // ---- InputEvent ----

    /// Appends one event. Fails the whole call (no partial row) on any
    /// underlying storage failure, aborting the calling capture pipeline
    /// while leaving the stream's prior state intact.
    pub fn append_event(&self, event: &NewEvent) -> Result<(), Error> {
        let conn = self.lock();
        conn.execute(
            "insert into input_event \
             (recording_id, session_id, stream_id, t_ms, kind, code, value, is_press) \
             values (:recording_id, :session_id, :stream_id, :t_ms, :kind, :code, :value, :is_press)",
            named_params! {
                ":recording_id": SqlUuid(event.recording_id),
                ":session_id": SqlUuid(event.session_id),
                ":stream_id": SqlUuid(event.stream_id),
                ":t_ms": event.t_ms,
                ":kind": event.kind.as_str(),
                ":code": &event.code,
                ":value": event.value,
                ":is_press": event.is_press.map(|b| b as i64),
            },
        )
        .map_err(|e| err!(Internal, "failed to append event: {e}"))?;
        Ok(())
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<InputEvent> {
        let recording_id: SqlUuid = row.get("recording_id")?;
        let session_id: SqlUuid = row.get("session_id")?;
        let stream_id: SqlUuid = row.get("stream_id")?;
        let kind: String = row.get("kind")?;
        Ok(InputEvent {
            id: row.get("id")?,
            recording_id: recording_id.0,
            session_id: session_id.0,
            stream_id: stream_id.0,
            t_ms: row.get("t_ms")?,
            kind: EventKind::parse(&kind).unwrap_or(EventKind::Axis),
            code: row.get("code")?,
            value: row.get("value")?,
            is_press: row.get::<_, Option<i64>>("is_press")?.map(|v| v != 0),
        })
    }

    /// Ordered scan over the given streams, optionally restricted to a set
    /// of kinds. Ordered by `(stream_id, t_ms, code)`; a merged cross-device
    /// view ordered by `(t_ms, code)` is left to callers that need it (the
    /// Aligner only ever looks at one stream's series at a time before
    /// merging numerically).
    pub fn scan_events(
        &self,
        stream_ids: &[Uuid],
        kinds: Option<&[EventKind]>,
    ) -> Result<Vec<InputEvent>, Error> {
        if stream_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock();
        let placeholders = stream_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let mut sql = format!(
            "select id, recording_id, session_id, stream_id, t_ms, kind, code, value, is_press \
             from input_event where stream_id in ({placeholders})"
        );
        if let Some(kinds) = kinds {
            let kind_list = kinds
                .iter()
                .map(|k| format!("'{}'", k.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(&format!(" and kind in ({kind_list})"));
        }
        sql.push_str(" order by stream_id, t_ms, code");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| err!(Internal, "failed to prepare event scan: {e}"))?;
        let params: Vec<SqlUuid> = stream_ids.iter().map(|id| SqlUuid(*id)).collect();
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            params.iter().map(|p| p as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_event)
            .map_err(|e| err!(Internal, "failed to scan events: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| err!(Internal, "failed to read event row: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn create_study_rejects_duplicate_label() {
        auth::set_test_params();
        let s = store();
        s.create_study("alpha", "1234", None, None).unwrap();
        let err = s.create_study("alpha", "5678", None, None).unwrap_err();
        assert_eq!(err.kind(), base::ErrorKind::AlreadyExists);
    }

    #[test]
    fn verify_pin_matches_create_pin() {
        auth::set_test_params();
        let s = store();
        let id = s.create_study("alpha", "1234", None, None).unwrap();
        assert!(s.verify_study_pin(id, "1234").unwrap());
        assert!(!s.verify_study_pin(id, "0000").unwrap());
    }

    #[test]
    fn delete_study_cascades() {
        auth::set_test_params();
        let s = store();
        let study_id = s.create_study("alpha", "1234", None, None).unwrap();
        let rec_id = s.create_recording(study_id, "/tmp/rec.mp4", None).unwrap();
        let session_id = s.create_session(rec_id, None, false).unwrap();
        let stream_id = s
            .create_stream(session_id, "gamepad0", None, Some("P1"), None)
            .unwrap();
        s.append_event(&NewEvent {
            recording_id: rec_id,
            session_id,
            stream_id,
            t_ms: 10,
            kind: EventKind::Axis,
            code: "ABS_X".into(),
            value: Some(500),
            is_press: None,
        })
        .unwrap();

        s.delete_study(study_id).unwrap();
        assert!(s.get_study(study_id).is_err());
        assert!(s.get_recording(rec_id).is_err());
        assert!(s.scan_events(&[stream_id], None).unwrap().is_empty());
    }

    #[test]
    fn create_stream_writes_init_event_at_t_zero() {
        auth::set_test_params();
        let s = store();
        let study_id = s.create_study("alpha", "1234", None, None).unwrap();
        let rec_id = s.create_recording(study_id, "/tmp/rec.mp4", None).unwrap();
        let session_id = s.create_session(rec_id, None, false).unwrap();
        let stream_id = s
            .create_stream(session_id, "gamepad0", None, None, None)
            .unwrap();
        let events = s.scan_events(&[stream_id], None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Init);
        assert_eq!(events[0].t_ms, 0);
    }

    #[test]
    fn scan_events_orders_by_stream_then_t_ms_then_code() {
        auth::set_test_params();
        let s = store();
        let study_id = s.create_study("alpha", "1234", None, None).unwrap();
        let rec_id = s.create_recording(study_id, "/tmp/rec.mp4", None).unwrap();
        let session_id = s.create_session(rec_id, None, false).unwrap();
        let stream_id = s
            .create_stream(session_id, "gamepad0", None, None, None)
            .unwrap();
        for (t, code) in [(20, "ABS_Y"), (20, "ABS_X"), (10, "ABS_X")] {
            s.append_event(&NewEvent {
                recording_id: rec_id,
                session_id,
                stream_id,
                t_ms: t,
                kind: EventKind::Axis,
                code: code.into(),
                value: Some(1),
                is_press: None,
            })
            .unwrap();
        }
        let events = s.scan_events(&[stream_id], Some(&[EventKind::Axis])).unwrap();
        let order: Vec<(i64, &str)> = events.iter().map(|e| (e.t_ms, e.code.as_str())).collect();
        assert_eq!(order, vec![(10, "ABS_X"), (20, "ABS_X"), (20, "ABS_Y")]);
    }
}
