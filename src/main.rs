use std::process::ExitCode;

use clap::Parser;

use vmcycle::app;
use vmcycle::cli::Cli;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help, version and usage errors all exit 1.
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    app::execute(cli)
}
