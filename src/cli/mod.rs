pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "finwire")]
#[command(about = "Financial news collection and aggregation", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/finwire/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the enabled sources in collection order
    Sources,
    /// Run one collection cycle and print the merged items
    Collect {
        /// Only print the first N items
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print the whole aggregation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one full refresh (collect and analyze) and write the result
    Refresh {
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Keep the result fresh in the background until interrupted
    Serve {
        /// Refresh interval (e.g., "30m", "1h")
        #[arg(short, long)]
        interval: Option<String>,

        /// Maximum age of a restored result before it is replaced (e.g., "60m")
        #[arg(long)]
        max_age: Option<String>,

        /// Skip the refresh on start
        #[arg(long)]
        no_initial_update: bool,

        /// Seed the cache from a result written by `refresh --output`
        #[arg(long)]
        warm_from: Option<PathBuf>,
    },
}
