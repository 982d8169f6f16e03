use std::process::ExitCode;

use clap::Parser;

use ingestwatch::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    ingestwatch::logging::init_logging(&cli.log_level, cli.log_json);

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
