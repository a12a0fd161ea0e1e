//! Builds the two flat export tables (axes, buttons) from a selection of
//! streams' events. Rendering to XLSX/SAV is left to external tooling; this
//! module only produces the rectangular row sets plus a CSV writer for the
//! one format simple enough to live in the core.

use base::{err, Error};
use db::{Display, EventKind, InputEvent, InputStream};
use std::io::Write;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    ChangeBased,
    TimeSeries,
}

#[derive(Debug, Clone)]
pub struct AxisRow {
    pub recording_id: Uuid,
    pub study_id: Uuid,
    pub session_id: Uuid,
    pub session_label: Option<String>,
    pub stream_id: Uuid,
    pub participant: String,
    pub device_name: String,
    pub profile_id: Option<String>,
    pub code: String,
    pub construct: Option<String>,
    pub t_ms: i64,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Press,
    Release,
}

#[derive(Debug, Clone)]
pub struct ButtonChangeRow {
    pub recording_id: Uuid,
    pub study_id: Uuid,
    pub session_id: Uuid,
    pub session_label: Option<String>,
    pub stream_id: Uuid,
    pub participant: String,
    pub device_name: String,
    pub profile_id: Option<String>,
    pub code: String,
    pub construct: Option<String>,
    pub t_ms: i64,
    pub event: ButtonEvent,
}

#[derive(Debug, Clone)]
pub struct ButtonStateRow {
    pub recording_id: Uuid,
    pub study_id: Uuid,
    pub session_id: Uuid,
    pub session_label: Option<String>,
    pub stream_id: Uuid,
    pub participant: String,
    pub device_name: String,
    pub profile_id: Option<String>,
    pub code: String,
    pub construct: Option<String>,
    pub t_ms: i64,
    pub state: u8,
}

pub enum ButtonRows {
    ChangeBased(Vec<ButtonChangeRow>),
    TimeSeries(Vec<ButtonStateRow>),
}

/// One stream's study/session context, needed to populate the export
/// tables' denormalized columns without a join at write time.
pub struct StreamContext<'a> {
    pub study_id: Uuid,
    pub session_id: Uuid,
    pub session_label: Option<String>,
    pub stream: &'a InputStream,
}

/// Builds the `axes`/`buttons` rectangular tables for a selection of
/// streams and their already-loaded events. `mode` selects change-based
/// (one row per raw press/release) vs. time-series (one row per converted
/// sample, already resampled by the caller via `TimeseriesConverter`) for
/// the buttons table; axis rows are always one row per raw axis sample in
/// this builder (time-series resampling for axes, if requested, happens
/// before rows are constructed, via the caller feeding converted samples
/// as synthetic events).
pub fn build(
    contexts: &[StreamContext],
    events_by_stream: &std::collections::BTreeMap<Uuid, Vec<InputEvent>>,
    mode: ExportMode,
) -> (Vec<AxisRow>, ButtonRows) {
    let mut axes = Vec::new();
    let mut change_rows = Vec::new();
    let mut state_rows = Vec::new();

    for ctx in contexts {
        let Some(events) = events_by_stream.get(&ctx.stream.id) else {
            continue;
        };
        let participant = ctx.stream.participant_label().to_string();
        for event in events {
            let construct = match ctx.stream.display_for(&event.code) {
                Display::Hidden => continue,
                Display::Labeled(l) => Some(l),
                Display::Raw => None,
            };
            match event.kind {
                EventKind::Axis => {
                    let Some(value) = event.value else { continue };
                    axes.push(AxisRow {
                        recording_id: event.recording_id,
                        study_id: ctx.study_id,
                        session_id: ctx.session_id,
                        session_label: ctx.session_label.clone(),
                        stream_id: ctx.stream.id,
                        participant: participant.clone(),
                        device_name: ctx.stream.device_name.clone(),
                        profile_id: ctx.stream.profile_id.clone(),
                        code: event.code.clone(),
                        construct: construct.clone(),
                        t_ms: event.t_ms,
                        value,
                    });
                }
                EventKind::Button => match mode {
                    ExportMode::ChangeBased => {
                        let Some(is_press) = event.is_press else { continue };
                        change_rows.push(ButtonChangeRow {
                            recording_id: event.recording_id,
                            study_id: ctx.study_id,
                            session_id: ctx.session_id,
                            session_label: ctx.session_label.clone(),
                            stream_id: ctx.stream.id,
                            participant: participant.clone(),
                            device_name: ctx.stream.device_name.clone(),
                            profile_id: ctx.stream.profile_id.clone(),
                            code: event.code.clone(),
                            construct: construct.clone(),
                            t_ms: event.t_ms,
                            event: if is_press { ButtonEvent::Press } else { ButtonEvent::Release },
                        });
                    }
                    ExportMode::TimeSeries => {
                        let Some(value) = event.value else { continue };
                        state_rows.push(ButtonStateRow {
                            recording_id: event.recording_id,
                            study_id: ctx.study_id,
                            session_id: ctx.session_id,
                            session_label: ctx.session_label.clone(),
                            stream_id: ctx.stream.id,
                            participant: participant.clone(),
                            device_name: ctx.stream.device_name.clone(),
                            profile_id: ctx.stream.profile_id.clone(),
                            code: event.code.clone(),
                            construct: construct.clone(),
                            t_ms: event.t_ms,
                            state: value.clamp(0, 1) as u8,
                        });
                    }
                },
                EventKind::Init => {}
            }
        }
    }

    sort_rows(&mut axes, &mut change_rows, &mut state_rows, mode);

    let buttons = match mode {
        ExportMode::ChangeBased => ButtonRows::ChangeBased(change_rows),
        ExportMode::TimeSeries => ButtonRows::TimeSeries(state_rows),
    };
    (axes, buttons)
}

fn sort_rows(
    axes: &mut [AxisRow],
    change_rows: &mut [ButtonChangeRow],
    state_rows: &mut [ButtonStateRow],
    mode: ExportMode,
) {
    match mode {
        ExportMode::ChangeBased => {
            axes.sort_by_key(|r| (r.session_id, r.stream_id, r.code.clone(), r.t_ms));
            change_rows.sort_by_key(|r| (r.session_id, r.stream_id, r.code.clone(), r.t_ms));
        }
        ExportMode::TimeSeries => {
            axes.sort_by_key(|r| (r.t_ms, r.session_id, r.stream_id, r.code.clone()));
            state_rows.sort_by_key(|r| (r.t_ms, r.session_id, r.stream_id, r.code.clone()));
        }
    }
}

/// Writes the axes table as CSV. The `buttons` table is written by a
/// separate call since the two tables have different columns.
pub fn write_axes_csv(rows: &[AxisRow], out: impl Write) -> Result<(), Error> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record([
        "recording_id",
        "study_id",
        "session_id",
        "session_label",
        "stream_id",
        "participant",
        "device_name",
        "profile_id",
        "code",
        "construct",
        "t_ms",
        "value",
    ])
    .map_err(|e| err!(Internal, "failed to write axes header: {e}"))?;
    for r in rows {
        w.write_record([
            r.recording_id.to_string(),
            r.study_id.to_string(),
            r.session_id.to_string(),
            r.session_label.clone().unwrap_or_default(),
            r.stream_id.to_string(),
            r.participant.clone(),
            r.device_name.clone(),
            r.profile_id.clone().unwrap_or_default(),
            r.code.clone(),
            r.construct.clone().unwrap_or_default(),
            r.t_ms.to_string(),
            r.value.to_string(),
        ])
        .map_err(|e| err!(Internal, "failed to write axes row: {e}"))?;
    }
    w.flush().map_err(|e| err!(Internal, "failed to flush axes csv: {e}"))
}

pub fn write_buttons_csv(rows: &ButtonRows, out: impl Write) -> Result<(), Error> {
    let mut w = csv::Writer::from_writer(out);
    match rows {
        ButtonRows::ChangeBased(rows) => {
            w.write_record([
                "recording_id",
                "study_id",
                "session_id",
                "session_label",
                "stream_id",
                "participant",
                "device_name",
                "profile_id",
                "code",
                "construct",
                "t_ms",
                "event",
            ])
            .map_err(|e| err!(Internal, "failed to write buttons header: {e}"))?;
            for r in rows {
                w.write_record([
                    r.recording_id.to_string(),
                    r.study_id.to_string(),
                    r.session_id.to_string(),
                    r.session_label.clone().unwrap_or_default(),
                    r.stream_id.to_string(),
                    r.participant.clone(),
                    r.device_name.clone(),
                    r.profile_id.clone().unwrap_or_default(),
                    r.code.clone(),
                    r.construct.clone().unwrap_or_default(),
                    r.t_ms.to_string(),
                    match r.event {
                        ButtonEvent::Press => "press".to_string(),
                        ButtonEvent::Release => "release".to_string(),
                    },
                ])
                .map_err(|e| err!(Internal, "failed to write buttons row: {e}"))?;
            }
        }
        ButtonRows::TimeSeries(rows) => {
            w.write_record([
                "recording_id",
                "study_id",
                "session_id",
                "session_label",
                "stream_id",
                "participant",
                "device_name",
                "profile_id",
                "code",
                "construct",
                "t_ms",
                "state",
            ])
            .map_err(|e| err!(Internal, "failed to write buttons header: {e}"))?;
            for r in rows {
                w.write_record([
                    r.recording_id.to_string(),
                    r.study_id.to_string(),
                    r.session_id.to_string(),
                    r.session_label.clone().unwrap_or_default(),
                    r.stream_id.to_string(),
                    r.participant.clone(),
                    r.device_name.clone(),
                    r.profile_id.clone().unwrap_or_default(),
                    r.code.clone(),
                    r.construct.clone().unwrap_or_default(),
                    r.t_ms.to_string(),
                    r.state.to_string(),
                ])
                .map_err(|e| err!(Internal, "failed to write buttons row: {e}"))?;
            }
        }
    }
    w.flush().map_err(|e| err!(Internal, "failed to flush buttons csv: {e}"))
}

/// Validates an `--format` flag value. Only `csv` is fully implemented;
/// `xlsx`/`sav` are recognized as legitimate formats handed off to external
/// tooling but not produced by this crate.
pub fn validate_format(format: &str) -> Result<(), Error> {
    match format {
        "csv" | "xlsx" | "sav" => Ok(()),
        other => Err(err!(InvalidArgument, "unknown export format {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn stream(id: Uuid, session_id: Uuid) -> InputStream {
        InputStream {
            id,
            session_id,
            device_name: "pad0".to_string(),
            profile_id: None,
            alias: Some("P1".to_string()),
            construct_mapping: {
                let mut m = std::collections::BTreeMap::new();
                m.insert("BTN_HIDDEN".to_string(), db::HIDE_LABEL.to_string());
                m.insert("ABS_X".to_string(), "steering".to_string());
                m
            },
            calibration_data: None,
            allowed_inputs: None,
        }
    }

    fn event(stream_id: Uuid, t_ms: i64, kind: EventKind, code: &str, value: Option<i32>, is_press: Option<bool>) -> InputEvent {
        InputEvent {
            id: 0,
            recording_id: Uuid::nil(),
            session_id: Uuid::nil(),
            stream_id,
            t_ms,
            kind,
            code: code.to_string(),
            value,
            is_press,
        }
    }

    #[test]
    fn hidden_construct_is_excluded_from_axes_and_buttons() {
        let session_id = Uuid::nil();
        let stream_id = Uuid::now_v7();
        let s = stream(stream_id, session_id);
        let ctx = StreamContext {
            study_id: Uuid::nil(),
            session_id,
            session_label: None,
            stream: &s,
        };
        let mut events_by_stream = BTreeMap::new();
        events_by_stream.insert(
            stream_id,
            vec![
                event(stream_id, 10, EventKind::Axis, "ABS_X", Some(500), None),
                event(stream_id, 20, EventKind::Button, "BTN_HIDDEN", Some(1), Some(true)),
            ],
        );
        let (axes, buttons) = build(&[ctx], &events_by_stream, ExportMode::ChangeBased);
        assert_eq!(axes.len(), 1);
        assert_eq!(axes[0].construct.as_deref(), Some("steering"));
        match buttons {
            ButtonRows::ChangeBased(rows) => assert!(rows.is_empty()),
            _ => panic!("expected change-based rows"),
        }
    }

    #[test]
    fn change_based_sorts_by_session_stream_code_time() {
        let session_id = Uuid::nil();
        let stream_id = Uuid::now_v7();
        let s = stream(stream_id, session_id);
        let ctx = StreamContext {
            study_id: Uuid::nil(),
            session_id,
            session_label: None,
            stream: &s,
        };
        let mut events_by_stream = BTreeMap::new();
        events_by_stream.insert(
            stream_id,
            vec![
                event(stream_id, 30, EventKind::Axis, "ABS_X", Some(1), None),
                event(stream_id, 10, EventKind::Axis, "ABS_X", Some(2), None),
            ],
        );
        let (axes, _) = build(&[ctx], &events_by_stream, ExportMode::ChangeBased);
        assert_eq!(axes.iter().map(|r| r.t_ms).collect::<Vec<_>>(), vec![10, 30]);
    }

    #[test]
    fn validate_format_rejects_unknown() {
        assert!(validate_format("csv").is_ok());
        assert!(validate_format("parquet").is_err());
    }
}
