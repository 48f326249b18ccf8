//! xeda CLI binary
//!
//! Before parsing ordinary CLI arguments, checks for the hidden worker
//! re-exec argument `xeda-dse` uses to farm candidate runs out to
//! separate OS processes (spec §4.9): if present, this process is a DSE
//! worker, not a user-facing invocation. Otherwise delegates entirely to
//! `xeda-cli`, which handles all output including errors.

fn main() {
    let mut args = std::env::args();
    let _argv0 = args.next();
    if args.next().as_deref() == Some(xeda_dse::WORKER_ARG) {
        if let Err(e) = xeda_dse::worker_main() {
            eprintln!("worker error: {e}");
            std::process::exit(2);
        }
        return;
    }

    std::process::exit(xeda_cli::run());
}
