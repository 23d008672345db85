//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use output::progress::{create_spinner, ProgressBarExt};
pub use types::{AskArgs, Cli, Commands, ConfigArgs, ConfigCommands};

/// Report a failed command on stderr and exit with status 1.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{body}");
    } else {
        eprintln!("{}", output::action_failure(&format!("{err:#}")));
    }
    std::process::exit(1)
}
