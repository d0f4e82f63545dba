use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod run;

use cli::Cli;

const EXIT_FAILED_INPUTS: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run::execute(&cli) {
        Ok(0) => 0,
        Ok(failed) => {
            tracing::warn!("{} input(s) failed", failed);
            EXIT_FAILED_INPUTS
        }
        Err(e) => {
            eprintln!("❌ {e:#}");
            EXIT_CONFIG_ERROR
        }
    };
    std::process::exit(code);
}
