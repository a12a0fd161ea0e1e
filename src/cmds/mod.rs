//! Subcommand implementations, one module per CLI verb. Each exposes a
//! `bpaf`-derived `Args` struct and a `run(Args) -> Result<i32, Error>`
//! entry point, dispatched from `main`.

pub mod analyze;
pub mod export;
pub mod init;
pub mod record;
pub mod review;
pub mod study;

use base::{err, Error};
use db::Store;
use std::path::{Path, PathBuf};

/// The per-user app-data directory: `store.db` plus `studies/<id>/...`.
/// A platform-appropriate constant fallback, overridable by `--app-home` /
/// `HSPARC_HOME`.
pub fn default_app_home() -> PathBuf {
    if let Ok(v) = std::env::var("HSPARC_HOME") {
        return PathBuf::from(v);
    }
    dirs_default()
}

#[cfg(target_os = "linux")]
fn dirs_default() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/root".to_string());
            Path::new(&home).join(".local/share")
        })
        .join("hsparc")
}

#[cfg(not(target_os = "linux"))]
fn dirs_default() -> PathBuf {
    PathBuf::from("hsparc-data")
}

/// Opens the `Store` at `<app_home>/store.db`, requiring that `init` has
/// already created the app-home layout.
pub fn open_store(app_home: &Path) -> Result<Store, Error> {
    let db_path = app_home.join("store.db");
    if !db_path.exists() {
        return Err(err!(
            NotFound,
            "no store at {}; run `hsparc init` first",
            app_home.display()
        ));
    }
    Store::open(&db_path)
}

/// Directory holding a study's sealed media and instructions.
pub fn study_dir(app_home: &Path, study_id: uuid::Uuid) -> PathBuf {
    app_home.join("studies").join(study_id.to_string())
}

/// Up to 3 PIN attempts per guarded action.
pub const MAX_PIN_ATTEMPTS: i64 = 3;

/// Verifies `pin` against `study_id`, recording the attempt and enforcing
/// the 3-attempts-per-process-lifetime cap for `action`.
pub fn verify_pin_with_policy(
    store: &Store,
    study_id: uuid::Uuid,
    action: &str,
    pin: &str,
) -> Result<(), Error> {
    let prefix_owned = study_id.to_string();
    let prefix = &prefix_owned[..8];
    let failures = store.count_pin_failures(prefix, action)?;
    if failures >= MAX_PIN_ATTEMPTS {
        return Err(err!(PermissionDenied, "too many failed PIN attempts for {action}"));
    }
    let ok = store.verify_study_pin(study_id, pin)?;
    store.record_pin_attempt(prefix, action, ok)?;
    if !ok {
        return Err(err!(Unauthenticated, "incorrect PIN"));
    }
    Ok(())
}
