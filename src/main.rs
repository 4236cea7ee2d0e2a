mod api;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::services::LeagueService;

#[derive(Parser)]
#[command(name = "league")]
#[command(about = "Round-robin league simulator with championship predictions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Initialize the database
    InitDb,
    /// Load the team roster, replacing any existing league
    Seed {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Generate a fresh double round-robin schedule
    Generate,
    /// Simulate the current week
    PlayWeek,
    /// Simulate every remaining week
    PlayAll,
    /// Clear all results and keep the fixtures
    Reset,
    /// Overwrite the score of a completed match
    Edit {
        #[arg(short, long)]
        week: usize,
        #[arg(short, long)]
        index: usize,
        #[arg(long)]
        home: u32,
        #[arg(long)]
        away: u32,
    },
    /// Show the league table
    Standings,
    /// Show every week of fixtures
    Fixtures,
    /// Query a team's record and fixtures
    Team {
        #[arg(short, long)]
        name: String,
    },
    /// Export the standings as CSV
    Export {
        #[arg(short, long, default_value = "data/standings.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = db::open_store(&config).await?;
    let service = Arc::new(LeagueService::from_config(store, &config));

    match cli.command {
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting league API server on port {}", port);
            api::serve(port, service).await?;
        }
        Some(Commands::InitDb) => {
            // Opening the store already created the schema.
            println!("✅ Database ready at {}", config.database_url);
        }
        Some(Commands::Seed { file }) => {
            let file = file.unwrap_or_else(|| config.teams_file.clone());
            cli::seed(&service, &file).await?;
        }
        Some(Commands::Generate) => cli::generate_fixtures(&service).await?,
        Some(Commands::PlayWeek) => cli::play_week(&service).await?,
        Some(Commands::PlayAll) => cli::play_all(&service).await?,
        Some(Commands::Reset) => cli::reset(&service).await?,
        Some(Commands::Edit { week, index, home, away }) => {
            cli::edit_match(&service, week, index, home, away).await?;
        }
        Some(Commands::Standings) => cli::show_standings(&service).await?,
        Some(Commands::Fixtures) => cli::show_fixtures(&service).await?,
        Some(Commands::Team { name }) => {
            tracing::info!("Querying team: {}", name);
            cli::query_team(&service, &name).await?;
        }
        Some(Commands::Export { output }) => cli::export_standings(&service, &output).await?,
        None => {
            tracing::info!("Starting league API server on port 3000");
            api::serve(3000, service).await?;
        }
    }

    Ok(())
}
