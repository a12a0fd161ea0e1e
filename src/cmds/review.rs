//! `hsparc review --recording <id>` — lists the sessions, streams, and
//! event counts captured for a recording. The windowed playback/plot UI
//! that pairs this data with the sealed video lives elsewhere; this
//! subcommand's job is to surface what was captured so an external viewer
//! can load it.

use base::Error;
use bpaf::Bpaf;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

#[derive(Bpaf, Debug)]
#[bpaf(command("review"))]
pub struct Args {
    #[bpaf(long, argument("UUID"), parse(parse_uuid))]
    recording: Uuid,
    #[bpaf(long, argument("PATH"))]
    app_home: Option<PathBuf>,
}

fn parse_uuid(s: String) -> Result<Uuid, String> {
    Uuid::parse_str(&s).map_err(|e| e.to_string())
}

pub fn run(args: Args) -> Result<i32, Error> {
    let app_home = args.app_home.unwrap_or_else(super::default_app_home);
    let store = super::open_store(&app_home)?;

    let recording = store.get_recording(args.recording)?;
    info!(recording_id = %recording.id, video_path = %recording.video_path, "recording");

    for session in store.list_sessions(recording.id)? {
        let streams = store.list_streams(session.id)?;
        println!(
            "session {} label={:?} recognition_required={} streams={}",
            session.id,
            session.label,
            session.recognition_check_required,
            streams.len()
        );
        for stream in &streams {
            let events = store.scan_events(&[stream.id], None)?;
            println!(
                "  stream {} alias={:?} device={:?} events={}",
                stream.id,
                stream.alias,
                stream.device_name,
                events.len()
            );
        }
    }

    Ok(0)
}
