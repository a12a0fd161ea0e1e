use base::{Error, ErrorKind};
use bpaf::{Bpaf, Parser};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

mod analysis;
mod capture;
mod cmds;
mod config;
mod export;
mod timeseries;

// This is either in the environment when `cargo` is invoked or set from within `build.rs`.
const VERSION: &str = env!("VERSION");

/// HSPARC: synchronized multi-participant controller-input recorder and
/// analyzer for human subjects research.
#[derive(Bpaf, Debug)]
#[bpaf(options, version(VERSION))]
enum Args {
    // See docstrings of `cmds::*::Args` structs for a description of the respective subcommands.
    Init(#[bpaf(external(cmds::init::args))] cmds::init::Args),
    Record(#[bpaf(external(cmds::record::args))] cmds::record::Args),
    Review(#[bpaf(external(cmds::review::args))] cmds::review::Args),
    Analyze(#[bpaf(external(cmds::analyze::args))] cmds::analyze::Args),
    Export(#[bpaf(external(cmds::export::args))] cmds::export::Args),
    Study(#[bpaf(external(cmds::study::args))] cmds::study::Args),
}

impl Args {
    fn run(self) -> Result<i32, Error> {
        match self {
            Args::Init(a) => cmds::init::run(a),
            Args::Record(a) => cmds::record::run(a),
            Args::Review(a) => cmds::review::run(a),
            Args::Analyze(a) => cmds::analyze::run(a),
            Args::Export(a) => cmds::export::run(a),
            Args::Study(a) => cmds::study::run(a),
        }
    }
}

fn main() {
    // If using the clock will fail, find out now *before* trying to log
    // anything (with timestamps...) so we can print a helpful error.
    if let Err(e) = nix::time::clock_gettime(nix::time::ClockId::CLOCK_MONOTONIC) {
        eprintln!(
            "clock_gettime failed: {e}\n\n\
             This indicates a broken environment. See the troubleshooting guide."
        );
        std::process::exit(1);
    }

    base::tracing_setup::install();

    // Get the program name from the OS (e.g. if invoked as `target/debug/hsparc`: `hsparc`),
    // falling back to the crate name if conversion to a path/UTF-8 string fails.
    // `bpaf`'s default logic is similar but doesn't have the fallback.
    let progname = std::env::args_os().next().map(PathBuf::from);
    let progname = progname
        .as_deref()
        .and_then(Path::file_name)
        .and_then(OsStr::to_str)
        .unwrap_or(env!("CARGO_PKG_NAME"));

    let args = match args()
        .fallback_to_usage()
        .run_inner(bpaf::Args::current_args().set_name(progname))
    {
        Ok(a) => a,
        Err(e) => std::process::exit(e.exit_code()),
    };
    tracing::trace!("Parsed command-line arguments: {args:#?}");

    match args.run() {
        Err(e) => {
            error!(err = %e.chain(), "exiting due to error");
            ::std::process::exit(exit_code_for(e.kind()));
        }
        Ok(rv) => {
            debug!("exiting with status {}", rv);
            std::process::exit(rv)
        }
    }
}

/// Maps an error kind to a process exit code: `2` for a usage mistake the
/// caller can fix by changing their invocation, `3` for a resource the
/// caller named that doesn't exist, `4` for a failed PIN/authentication
/// check, and `5` for everything else.
fn exit_code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::OutOfRange => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Unauthenticated | ErrorKind::PermissionDenied => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn bpaf_invariants() {
        super::args().check_invariants(false);
    }
}
