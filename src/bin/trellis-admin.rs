use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::RngExt;
use std::sync::Arc;
use trellis::config::Config;
use trellis::storage::{SqliteStorage, Storage};

#[derive(Parser)]
#[command(name = "trellis-admin")]
#[command(about = "Trellis admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a user with a fresh API token (identity itself is managed
    /// outside this service)
    CreateUser {
        username: String,
        email: String,
    },
    /// Delete analytics events older than the given number of days
    PruneEvents {
        #[arg(long, default_value_t = 90)]
        days: i64,
    },
    /// Manually override a user's premium flag by email
    SetPremium {
        email: String,
        #[arg(long)]
        premium: bool,
    },
}

fn generate_token() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    (0..40)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
    );
    storage.init().await?;

    match cli.command {
        Commands::CreateUser { username, email } => {
            let token = generate_token();
            let user = storage.create_user(&username, &email, &token).await?;
            println!("✓ Created user '{}' (id {})", user.username, user.id);
            println!("  API token: {token}");
        }
        Commands::PruneEvents { days } => {
            let cutoff =
                chrono::Utc::now().timestamp_millis() - days * 24 * 60 * 60 * 1000;
            let removed = storage.prune_events_before(cutoff).await?;
            println!("✓ Pruned {removed} analytics events older than {days} days");
        }
        Commands::SetPremium { email, premium } => {
            let affected = storage.override_premium(&email, premium).await?;
            if affected > 0 {
                println!("✓ Set premium={premium} for '{email}'");
            } else {
                println!("⚠ No user found for '{email}'");
            }
        }
    }

    Ok(())
}
