use anyhow::Result;
use clap::{Parser, Subcommand};
use fm_pipeline::{build_gateway, PipelineConfig};

#[derive(Debug, Parser)]
#[command(name = "fm-cli")]
#[command(about = "FirstMover rental listing watcher")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one ingest cycle: fetch, dedup, persist, notify.
    Ingest,
    /// Start the web server (and the cron scheduler when enabled).
    Serve,
    /// Fetch the latest batch and print it without touching any state.
    Fetch {
        #[arg(long)]
        per_page: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Ingest) {
        Commands::Ingest => {
            let summary = fm_pipeline::run_ingest_once_from_env().await?;
            println!(
                "ingest complete: run_id={} fetched={} new={} broadcasts={} push_batches={}",
                summary.run_id,
                summary.fetched,
                summary.new_listings.len(),
                summary.broadcasts_sent,
                summary.push_batches_sent
            );
        }
        Commands::Serve => {
            fm_web::serve_from_env().await?;
        }
        Commands::Fetch { per_page } => {
            let config = PipelineConfig::from_env();
            let gateway = build_gateway(&config)?;
            let listings = gateway.fetch(per_page.unwrap_or(config.per_page)).await?;
            println!("{}", serde_json::to_string_pretty(&listings)?);
        }
    }

    Ok(())
}
