//! `hsparc export --recording <id> --format csv --mode change|timeseries`
//! — wraps `crate::export`'s table builder, writing `axes.csv` and
//! `buttons.csv` into the study directory.

use crate::export::{self, ExportMode, StreamContext};
use base::{err, Error};
use bpaf::Bpaf;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

#[derive(Bpaf, Debug)]
#[bpaf(command("export"))]
pub struct Args {
    #[bpaf(long, argument("UUID"), parse(parse_uuid))]
    recording: Uuid,
    #[bpaf(long, argument("csv|xlsx|sav"), fallback("csv".to_string()))]
    format: String,
    /// `change` (one row per press/release) or `timeseries` (resampled).
    #[bpaf(long, argument("change|timeseries"), fallback("change".to_string()), parse(parse_mode))]
    mode: ExportMode,
    /// Output directory for `axes.csv`/`buttons.csv`; defaults to the
    /// current directory.
    #[bpaf(long, argument("PATH"), optional)]
    out_dir: Option<PathBuf>,
    #[bpaf(long, argument("PATH"))]
    app_home: Option<PathBuf>,
}

fn parse_uuid(s: String) -> Result<Uuid, String> {
    Uuid::parse_str(&s).map_err(|e| e.to_string())
}

fn parse_mode(s: String) -> Result<ExportMode, String> {
    match s.as_str() {
        "change" => Ok(ExportMode::ChangeBased),
        "timeseries" => Ok(ExportMode::TimeSeries),
        other => Err(format!("unknown export mode {other:?}")),
    }
}

pub fn run(args: Args) -> Result<i32, Error> {
    export::validate_format(&args.format)?;
    if args.format != "csv" {
        return Err(err!(
            Unavailable,
            "format {:?} is produced by an external collaborator; only csv is built in",
            args.format
        ));
    }

    let app_home = args.app_home.unwrap_or_else(super::default_app_home);
    let store = super::open_store(&app_home)?;
    let recording = store.get_recording(args.recording)?;
    let study = store.get_study(recording.study_id)?;

    let mode = args.mode;

    let mut contexts = Vec::new();
    let mut streams = Vec::new();
    for session in store.list_sessions(recording.id)? {
        for stream in store.list_streams(session.id)? {
            streams.push((session.id, session.label.clone(), stream));
        }
    }
    for (session_id, session_label, stream) in &streams {
        contexts.push(StreamContext {
            study_id: study.id,
            session_id: *session_id,
            session_label: session_label.clone(),
            stream,
        });
    }

    let mut events_by_stream = BTreeMap::new();
    for (_, _, stream) in &streams {
        let events = store.scan_events(&[stream.id], None)?;
        events_by_stream.insert(stream.id, events);
    }

    let (axes, buttons) = export::build(&contexts, &events_by_stream, mode);

    let out_dir = args.out_dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| err!(Internal, "failed to create output directory: {e}"))?;

    let axes_path = out_dir.join("axes.csv");
    let axes_file = std::fs::File::create(&axes_path)
        .map_err(|e| err!(Internal, "failed to create {}: {e}", axes_path.display()))?;
    export::write_axes_csv(&axes, axes_file)?;

    let buttons_path = out_dir.join("buttons.csv");
    let buttons_file = std::fs::File::create(&buttons_path)
        .map_err(|e| err!(Internal, "failed to create {}: {e}", buttons_path.display()))?;
    export::write_buttons_csv(&buttons, buttons_file)?;

    info!(
        recording_id = %recording.id,
        axes = axes.len(),
        out_dir = %out_dir.display(),
        "export complete"
    );
    Ok(0)
}
