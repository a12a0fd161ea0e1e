//! `hsparc record --study <label>` — starts a recording: creates a
//! Recording + ObserverSession, spawns one `DeviceReader` per configured
//! device, and runs until SIGINT or an explicit stop is requested.

use crate::capture::{CapturePipeline, DeviceAssignment};
use crate::config::Config;
use base::{err, Error};
use bpaf::Bpaf;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Bpaf, Debug)]
#[bpaf(command("record"))]
pub struct Args {
    /// Label of the study to record under.
    #[bpaf(long, argument("LABEL"))]
    study: String,
    /// Freeform notes stored on the recording.
    #[bpaf(long, argument("TEXT"), optional)]
    notes: Option<String>,
    #[bpaf(long, argument("PATH"))]
    app_home: Option<PathBuf>,
}

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

fn install_sigint_handler() {
    unsafe {
        libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
    }
}

pub fn run(args: Args) -> Result<i32, Error> {
    let app_home = args.app_home.unwrap_or_else(super::default_app_home);
    let store = Arc::new(super::open_store(&app_home)?);
    let config = Config::load(&app_home)?;

    if config.devices.is_empty() {
        return Err(err!(
            FailedPrecondition,
            "no devices configured; add [[devices]] entries to {}/config.toml",
            app_home.display()
        ));
    }

    let study = store
        .get_study_by_label(&args.study)
        .map_err(|_| err!(NotFound, "no such study {:?}", args.study))?;

    let video_path = format!("studies/{}/recordings/pending.mp4", study.id);
    let recording_id = store.create_recording(study.id, &video_path, args.notes.as_deref())?;
    let session_id = store.create_session(recording_id, None, false)?;

    let mut assignments = Vec::with_capacity(config.devices.len());
    for device in &config.devices {
        let stream_id = store.create_stream(session_id, &device.alias, device.profile_id.as_deref(), Some(&device.alias), None)?;
        assignments.push(DeviceAssignment {
            device_path: device.path.clone(),
            stream_id,
            alias: device.alias.clone(),
            calibration: None,
            allowed_inputs: None,
        });
    }

    info!(study = %args.study, recording_id = %recording_id, devices = assignments.len(), "recording started");

    let clocks: Arc<dyn base::Clocks> = Arc::new(base::RealClocks);
    let pipeline = CapturePipeline::start(recording_id, session_id, assignments, clocks, Arc::clone(&store));

    install_sigint_handler();
    STOP_REQUESTED.store(false, Ordering::SeqCst);
    while !STOP_REQUESTED.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }

    info!("stopping recording");
    let outcomes = pipeline.stop();
    for (stream_id, outcome) in outcomes {
        if let Err(e) = outcome {
            tracing::warn!(%stream_id, err = %e, "device reader exited with an error");
        }
    }

    info!(recording_id = %recording_id, "recording stopped");
    Ok(0)
}
