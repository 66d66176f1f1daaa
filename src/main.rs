// CLI binary entry point for oggframe
//
// Copies, inspects and summarizes Ogg streams using the oggframe library.

mod cli;

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use cli::commands::{command_copy, command_info, command_inspect};
use cli::{Commands, Config, OutputFormatter};

fn main() {
    let config = Config::parse();
    init_logging(&config);

    if let Err(e) = run(&config) {
        tracing::error!("{:#}", e);
        process::exit(1);
    }
}

fn init_logging(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(config: &Config) -> anyhow::Result<()> {
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match &config.command {
        Commands::Copy { input, output } => {
            command_copy(input.clone(), output.clone(), &formatter)?;
        }
        Commands::Inspect { files, data } => {
            command_inspect(files, *data, &formatter)?;
        }
        Commands::Info { files } => {
            command_info(files, &formatter)?;
        }
    }
    Ok(())
}
