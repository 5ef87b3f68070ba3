use std::process::ExitCode;

use clap::Parser;

use graphloom_cli::{
    cli::{Cli, Commands},
    commands,
    config::CliConfig,
    logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level, cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Schema => {
            commands::schema::execute(cli.format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stats => {
            let config = CliConfig::load(cli.config.as_deref())?;
            commands::stats::execute(config, cli.format).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Load {
            max_attempts,
            retry_delay,
        } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            commands::load::execute(config, cli.format, max_attempts, retry_delay).await
        }
    }
}
