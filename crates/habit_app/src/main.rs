use std::process::ExitCode;

use clap::Parser;
use habit_app::{run, AppConfig, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().unwrap_or_default();
    cli.apply_to(&mut config);

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = run(&config, cli.command, &mut stdout) {
        eprintln!("habits: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
