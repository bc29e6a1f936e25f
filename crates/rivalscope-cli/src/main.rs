use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod analyze;
mod runs;

#[derive(Debug, Parser)]
#[command(name = "rivalscope-cli")]
#[command(about = "Competitor social-sentiment analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape, classify and aggregate one competitor's social profiles
    Analyze {
        #[arg(long)]
        competitor_id: Uuid,

        /// Existing analysis run to record into; a new run is created when omitted
        #[arg(long)]
        run_id: Option<Uuid>,

        /// Keep results in memory instead of writing them to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage analysis runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Print the statistics recorded for an analysis run
    Stats {
        #[arg(long)]
        run_id: Uuid,
    },
    /// Apply pending database migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum RunsCommands {
    /// Create a new analysis run for a competitor and print its id
    Create {
        #[arg(long)]
        competitor_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("rivalscope-cli: no command given, see --help");
        return Ok(());
    };

    let config = rivalscope_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = rivalscope_db::connect_pool(
        &config.database_url,
        rivalscope_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match command {
        Commands::Analyze {
            competitor_id,
            run_id,
            dry_run,
        } => analyze::run_analyze(&config, &pool, competitor_id, run_id, dry_run).await,
        Commands::Runs {
            command: RunsCommands::Create { competitor_id },
        } => runs::run_create(&pool, competitor_id).await,
        Commands::Stats { run_id } => runs::run_stats(&pool, run_id).await,
        Commands::Migrate => {
            let applied = rivalscope_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
    }
}
