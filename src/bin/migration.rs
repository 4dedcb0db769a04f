use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use workshop_api::{
    config::{self, AppConfig},
    db,
    migrator::Migrator,
};

#[derive(Parser, Debug)]
#[command(name = "migration", about = "Workshop database schema management")]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Applies every pending migration
    Up,
    /// Checks connectivity and lists applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg: AppConfig = config::load_config().context("failed to load configuration")?;
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(environment = %cfg.environment, "connecting to database");
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;

    match cli.command {
        Command::Up => {
            db::run_migrations(&pool)
                .await
                .context("failed to apply migrations")?;
        }
        Command::Status => {
            db::check_connection(&pool)
                .await
                .context("database is unreachable")?;
            let applied = Migrator::get_applied_migrations(&pool)
                .await
                .context("failed to read migration table")?;
            let pending = Migrator::get_pending_migrations(&pool)
                .await
                .context("failed to read migration table")?;
            for migration in &applied {
                println!("applied  {}", migration.name());
            }
            for migration in &pending {
                println!("pending  {}", migration.name());
            }
            info!(applied = applied.len(), pending = pending.len(), "status checked");
        }
    }

    db::close_pool(pool).await.context("failed to close pool")?;
    Ok(())
}
