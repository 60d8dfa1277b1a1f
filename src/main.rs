//! boostflow - Main entry point

use boostflow::cli::{cmd_info, cmd_score, cmd_train, Cli, Commands};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boostflow=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            target,
            objective,
            params,
            output,
        } => {
            cmd_train(
                &data,
                &target,
                objective.as_deref(),
                params.as_ref(),
                &output,
            )?;
        }
        Commands::Score { model_dir, input } => {
            cmd_score(&model_dir, &input)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
