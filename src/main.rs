use clap::Parser;
use gov_calendar::cli::Cli;
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is fine; it only supplies optional settings.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    gov_calendar::init_logger(cli.log_level.as_deref());

    match gov_calendar::run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Fatal error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
