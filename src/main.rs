use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finwire::app::AppContext;
use finwire::cli::{commands, Cli, Commands};
use finwire::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config);

    match cli.command {
        Commands::Sources => {
            commands::list_sources(&ctx)?;
        }
        Commands::Collect { limit, json } => {
            commands::collect(&ctx, limit, json).await?;
        }
        Commands::Refresh { output } => {
            commands::refresh(&ctx, output.as_deref()).await?;
        }
        Commands::Serve {
            interval,
            max_age,
            no_initial_update,
            warm_from,
        } => {
            commands::serve(
                Arc::new(ctx),
                interval.as_deref(),
                max_age.as_deref(),
                no_initial_update,
                warm_from,
            )
            .await?;
        }
    }

    Ok(())
}
