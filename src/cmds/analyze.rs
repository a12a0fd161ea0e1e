//! `hsparc analyze --recording <id> --trace <stream>:<code> [--trace ...]`
//! — loads the named axis traces, runs the single/pairwise/multi analysis
//! dispatch, and prints a structured report.

use crate::analysis::{self, Results};
use base::{err, Error};
use bpaf::Bpaf;
use db::EventKind;
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Bpaf, Debug)]
#[bpaf(command("analyze"))]
pub struct Args {
    #[bpaf(long, argument("UUID"), parse(parse_uuid))]
    recording: Uuid,
    /// One or more `<stream-uuid>:<code>` pairs naming the axis traces to
    /// analyze, e.g. `--trace 3fe2...:ABS_X`.
    #[bpaf(long("trace"), argument("STREAM:CODE"))]
    traces: Vec<String>,
    #[bpaf(long, argument("PATH"))]
    app_home: Option<PathBuf>,
}

fn parse_uuid(s: String) -> Result<Uuid, String> {
    Uuid::parse_str(&s).map_err(|e| e.to_string())
}

fn parse_trace(spec: &str) -> Result<(Uuid, String), Error> {
    let (stream, code) = spec
        .split_once(':')
        .ok_or_else(|| err!(InvalidArgument, "trace {spec:?} must be <stream-uuid>:<code>"))?;
    let stream_id = Uuid::parse_str(stream)
        .map_err(|e| err!(InvalidArgument, "invalid stream uuid in {spec:?}: {e}"))?;
    Ok((stream_id, code.to_string()))
}

pub fn run(args: Args) -> Result<i32, Error> {
    let app_home = args.app_home.unwrap_or_else(super::default_app_home);
    let store = super::open_store(&app_home)?;

    if args.traces.is_empty() {
        return Err(err!(InvalidArgument, "at least one --trace is required"));
    }

    let mut streams: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
    for spec in &args.traces {
        let (stream_id, code) = parse_trace(spec)?;
        let stream = store.get_stream(stream_id)?;
        let events = store.scan_events(&[stream_id], Some(&[EventKind::Axis]))?;
        let series: Vec<(i64, f64)> = events
            .into_iter()
            .filter(|e| e.code == code)
            .map(|e| (e.t_ms, e.value.unwrap_or(0) as f64))
            .collect();
        if series.is_empty() {
            return Err(err!(
                NotFound,
                "no axis events for {recording}/{stream_id}:{code}",
                recording = args.recording
            ));
        }
        let label = stream.alias.clone().unwrap_or(code.clone());
        streams.insert(format!("{label}:{code}"), series);
    }

    match analysis::analyze(&streams)? {
        Results::Single(r) => {
            println!("single-trace analysis ({} samples)", r.temporal.sample_count);
            println!("{r:#?}");
        }
        Results::Pairwise(r) => {
            println!("pairwise analysis");
            println!("{r:#?}");
        }
        Results::Multi(r) => {
            println!("multi-trace analysis ({} traces)", r.trace_names.len());
            println!("{r:#?}");
        }
    }

    Ok(0)
}
