//! `hsparc init` — creates the app-home layout (`store.db`, `studies/`)
//! if it doesn't already exist. Every other subcommand requires this to
//! have run first.

use base::Error;
use bpaf::Bpaf;
use std::path::PathBuf;
use tracing::info;

/// Creates the app-home directory and an empty, migrated store.
#[derive(Bpaf, Debug)]
#[bpaf(command("init"))]
pub struct Args {
    /// Overrides the app-data directory (defaults to `$HSPARC_HOME` or the
    /// platform app-data directory).
    #[bpaf(long, argument("PATH"))]
    app_home: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<i32, Error> {
    let app_home = args.app_home.unwrap_or_else(super::default_app_home);
    std::fs::create_dir_all(&app_home)
        .map_err(|e| base::err!(Internal, "failed to create app home {}: {e}", app_home.display()))?;
    std::fs::create_dir_all(app_home.join("studies"))
        .map_err(|e| base::err!(Internal, "failed to create studies dir: {e}"))?;

    let db_path = app_home.join("store.db");
    let already_existed = db_path.exists();
    db::Store::open(&db_path)?; // applies migrations, creating the file if needed.

    if already_existed {
        info!(app_home = %app_home.display(), "store already initialized");
    } else {
        info!(app_home = %app_home.display(), "store initialized");
    }
    Ok(0)
}
