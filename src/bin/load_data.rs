use civic_lib::core::civic_store::CivicStore;
use civic_lib::core::config::Config;
use civic_lib::core::data_loader;
use civic_lib::core::database::Database;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Load provinces, districts, municipalities and wards from the ward dataset
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON array of {state, district, municipality, wards}
    #[arg(long)]
    file: PathBuf,

    /// Overrides the database URL from the settings file
    #[arg(long)]
    database_url: Option<String>,

    /// Delete all civic data before loading
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    if let Err(e) = load(args).await {
        error!("Data load failed: {}", e);
        std::process::exit(1);
    }
}

async fn load(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Fail on a bad path before touching the database
    let entries = data_loader::read_dataset(&args.file)?;

    let database_url = match args.database_url {
        Some(url) => url,
        None => Config::load()?.database_url,
    };
    let store = CivicStore::new(Database::init(&database_url).await?);

    if args.reset {
        store.reset().await?;
    }

    let summary = data_loader::load_entries(&store, &entries).await?;
    info!(
        "Data successfully loaded: {} municipalities, {} wards ({} entries skipped)",
        summary.municipalities, summary.wards, summary.skipped
    );

    Ok(())
}
