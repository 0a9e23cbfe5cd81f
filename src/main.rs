mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tessera::config::TesseraConfig;

#[derive(Parser)]
#[command(name = "tessera", version, about = "Work-context frames for AI coding agents, over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Search frames by text, Jira ticket or branch
    Search {
        /// Full-text query over reference points, summaries and keywords
        query: Option<String>,
        /// Exact Jira ticket id
        #[arg(long)]
        jira: Option<String>,
        /// Exact branch name
        #[arg(long)]
        branch: Option<String>,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Match any term instead of all terms
        #[arg(long)]
        any: bool,
    },
    /// Show frame store statistics
    Stats {
        /// List more modules
        #[arg(long)]
        detailed: bool,
    },
    /// List tools and deprecated aliases
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TesseraConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            tessera::server::serve_stdio(config).await?;
        }
        Command::Search {
            query,
            jira,
            branch,
            limit,
            any,
        } => {
            cli::search::search(
                &config,
                cli::search::SearchArgs {
                    query,
                    jira,
                    branch,
                    limit,
                    any,
                },
            )
            .await?;
        }
        Command::Stats { detailed } => {
            cli::stats::stats(&config, detailed).await?;
        }
        Command::Tools => {
            cli::list_tools()?;
        }
    }

    Ok(())
}
