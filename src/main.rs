use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

fn redact_host(url: &str) -> String {
    url.split('@')
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("?")
        .to_string()
}

use wager_slip::{
    catalog::GameCatalog,
    monitoring,
    placement::{BetPlacer, PlacementDelays},
    session::{self, Session},
    slip::{store::adopt_slip, SlipParams},
    storage::{self, recorder::PlacementRecorder},
    sync::SyncBridge,
    types::{AppConfig, RemoteBackend},
    utils::math::{combine_american_odds, format_american, to_decimal_odds},
};

#[derive(Parser, Debug)]
#[command(name = "wager-slip")]
#[command(about = "Interactive bet slip with remote persistence", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: String,

    /// Override the configured user id
    #[arg(long)]
    user: Option<String>,

    /// Override the remote backend (redis/http/memory)
    #[arg(long)]
    backend: Option<RemoteBackend>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive slip session on stdin
    Session {},
    /// Print the stored slip for the user
    Show {},
    /// List the user's placed bets
    Bets {},
    /// Odds utilities
    Odds {
        #[command(subcommand)]
        command: OddsCommands,
    },
}

#[derive(Subcommand, Debug)]
enum OddsCommands {
    /// Combine American odds into a parlay price
    Combine {
        #[arg(required = true, allow_hyphen_values = true)]
        odds: Vec<i32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", monitoring::logger::DEFAULT_LOG_FILTER);
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Session {});

    // Pure odds math needs neither config nor remotes.
    if let Commands::Odds {
        command: OddsCommands::Combine { odds },
    } = &command
    {
        return combine(odds);
    }

    tracing::debug!(target: "session", config = %cli.config, "loading config");
    let mut settings = AppConfig::load(&cli.config)?;
    if let Some(user) = cli.user {
        settings.user_id = user;
    }
    if let Some(backend) = cli.backend {
        settings.remote.backend = backend;
    }
    tracing::info!(
        target: "session",
        config = %cli.config,
        user = %settings.user_id,
        postgres_host = %settings
            .postgres
            .as_ref()
            .map(|p| redact_host(&p.url))
            .unwrap_or_else(|| "none".to_string()),
        "config loaded"
    );

    let remotes = storage::connect_remotes(&settings.remote)
        .await
        .context("failed to connect remote stores")?;

    match command {
        Commands::Show {} => {
            let slip = remotes.slips.read(&settings.user_id).await?.unwrap_or_default();
            let slip = adopt_slip(slip, &SlipParams::from(&settings.slip));
            println!("{}", session::render_slip(&slip));
        }
        Commands::Bets {} => {
            let bets = remotes.bets.list(&settings.user_id).await?;
            println!("{}", session::render_bets(&bets));
        }
        Commands::Session {} => {
            monitoring::logger::log_startup(&settings);

            let catalog = match &settings.catalog_path {
                Some(path) => GameCatalog::from_file(path)
                    .with_context(|| format!("failed to load catalog at {path}"))?,
                None => GameCatalog::empty(),
            };

            let bridge = SyncBridge::new(
                settings.user_id.clone(),
                SlipParams::from(&settings.slip),
                remotes.slips.clone(),
                settings.sync.write_timeout_ms.map(Duration::from_millis),
            );

            let mut placer = BetPlacer::new(
                remotes.bets.clone(),
                PlacementDelays::from(&settings.placement),
            );
            if let Some(pg) = &settings.postgres {
                let pool = storage::create_pg_pool(pg)
                    .await
                    .context("failed to connect postgres audit trail")?;
                placer = placer.with_recorder(PlacementRecorder::new(pool));
            }

            Session::new(catalog, bridge, placer, Arc::clone(&remotes.bets))
                .run()
                .await?;
        }
        Commands::Odds { .. } => {}
    }

    Ok(())
}

fn combine(odds: &[i32]) -> anyhow::Result<()> {
    let combined = combine_american_odds(odds)
        .ok_or_else(|| anyhow::anyhow!("odds must be non-zero and non-empty"))?;
    let decimal = to_decimal_odds(combined).unwrap_or_default();
    println!("{} (decimal {:.3})", format_american(combined), decimal);
    Ok(())
}
