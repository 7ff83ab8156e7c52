use std::process::ExitCode;

use clap::Parser;
use numbering_server::cli::{self, Cli};
use numbering_server::setup_environment;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = setup_environment("numbering-cli");

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    match cli::run(cli, config, &mut input, &mut out).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
