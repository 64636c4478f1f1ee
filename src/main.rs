//! Binary entrypoint that launches the Parley chat server.

use std::process::ExitCode;

use parley::start_parley;

/// Start the server with configuration from the environment.
fn main() -> ExitCode {
    start_parley::run()
}
