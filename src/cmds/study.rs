//! `hsparc study delete` — PIN-gated cascading deletion of a study.

use super::{default_app_home, open_store, verify_pin_with_policy};
use base::{err, Error};
use bpaf::Bpaf;
use std::path::PathBuf;
use tracing::info;

#[derive(Bpaf, Debug)]
#[bpaf(command("study"))]
pub enum Args {
    #[bpaf(command("delete"))]
    Delete {
        /// Label of the study to delete.
        #[bpaf(long, argument("LABEL"))]
        label: String,
        /// The study's PIN; required to authorize the cascading delete.
        #[bpaf(long, argument("PIN"))]
        pin: String,
        #[bpaf(long, argument("PATH"))]
        app_home: Option<PathBuf>,
    },
}

pub fn run(args: Args) -> Result<i32, Error> {
    match args {
        Args::Delete { label, pin, app_home } => {
            let app_home = app_home.unwrap_or_else(default_app_home);
            let store = open_store(&app_home)?;
            let study = store
                .get_study_by_label(&label)
                .map_err(|_| err!(NotFound, "no such study {label:?}"))?;
            verify_pin_with_policy(&store, study.id, "delete", &pin)?;
            store.delete_study(study.id)?;
            let dir = super::study_dir(&app_home, study.id);
            if dir.exists() {
                std::fs::remove_dir_all(&dir)
                    .map_err(|e| err!(Internal, "failed to remove study directory: {e}"))?;
            }
            info!(label = %label, "study deleted");
            Ok(0)
        }
    }
}
