use clap::{Parser, Subcommand};
use generator::naming::random_name_segment;
use telemetry::init_tracing_with_run_id;
use tracing::error;

use crate::config::load_generate_options;
use crate::core::{clean_clusters, generate_clusters};

mod config;
mod core;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision a batch of virtual clusters and register them
    Generate {
        /// Number of clusters to create, overrides `clusters.samples`
        #[arg(long)]
        samples: Option<usize>,

        /// Maximum number of clusters provisioned at once, overrides `clusters.concurrency`
        #[arg(long)]
        concurrency: Option<usize>,

        /// Fail when any cluster of the batch could not be provisioned
        #[arg(long)]
        strict: bool,
    },
    /// Delete every generated namespace and cluster secret
    Clean,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Generate { .. } => "generate",
            Commands::Clean => "clean",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let run_id = format!("{}-{}", args.command.name(), random_name_segment());
    let _log_flusher = init_tracing_with_run_id(env!("CARGO_BIN_NAME"), Some(run_id))?;

    let mut options = load_generate_options()?;
    if let Commands::Generate {
        samples,
        concurrency,
        strict,
    } = &args.command
    {
        if let Some(samples) = samples {
            options.clusters.samples = *samples;
        }
        if let Some(concurrency) = concurrency {
            options.clusters.concurrency = *concurrency;
        }
        options.clusters.strict |= *strict;
        options.validate()?;
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            match args.command {
                Commands::Generate { .. } => generate_clusters(options).await,
                Commands::Clean => clean_clusters(options).await,
            }
        });

    if let Err(err) = &result {
        error!("an error occurred in gen-resources: {err:#}");
    }

    result
}
