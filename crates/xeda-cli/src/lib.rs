//! Command-line front end over the flow engine: `run`, `dse`,
//! `list-flows`, `list-settings`, `scrub`.

mod cli;
mod design_file;
mod error;
mod exit_codes;
mod logging;
mod report;

pub use cli::run;
pub use error::CliError;
pub use exit_codes::codes;
