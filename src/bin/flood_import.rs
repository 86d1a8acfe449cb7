use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use drain_watch_service::config::naver_credentials_from_env;
use drain_watch_service::db::FloodDamageRepository;
use drain_watch_service::geocoder::NaverMapsClient;
use drain_watch_service::services::flood_import_service::{load_records, ImportMode};
use drain_watch_service::services::FloodImportService;
use indicatif::{ProgressBar, ProgressStyle};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "flood-import")]
#[command(about = "Geocode the municipal flood-damage dataset and load it into the database", long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env)]
    database_url: String,

    /// JSON array with 연번 / 주소 / 피해발생일자 keys
    #[arg(long)]
    file: PathBuf,

    /// Pause between geocoding calls in milliseconds
    #[arg(long, default_value = "100")]
    delay_ms: u64,

    /// 'replace' clears the table first; 'sync' upserts by sequence and prunes missing rows
    #[arg(long, value_enum, default_value = "replace")]
    mode: ImportMode,

    /// Override the Naver Maps API host
    #[arg(long, env = "NAVER_MAPS_BASE_URL")]
    naver_base_url: Option<String>,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if !cli.file.exists() {
        error!("File not found: {:?}", cli.file);
        return Err(format!("File not found: {:?}", cli.file).into());
    }

    let records = load_records(&cli.file)?;
    info!("Loaded {} flood damage rows from {:?}", records.len(), cli.file);

    let credentials = naver_credentials_from_env();
    let geocoder = match cli.naver_base_url {
        Some(base_url) => NaverMapsClient::with_base_url(base_url, credentials),
        None => NaverMapsClient::new(credentials),
    };
    if !geocoder.has_credentials() {
        return Err("NAVER_MAPS_CLIENT_ID and NAVER_MAPS_CLIENT_SECRET must be set".into());
    }

    if !cli.yes {
        println!("File: {:?}", cli.file);
        println!("Rows: {}", records.len());
        match cli.mode {
            ImportMode::Replace => {
                println!("Mode: replace (ALL existing flood damage records will be deleted)")
            }
            ImportMode::Sync => println!("Mode: sync (upsert by sequence, prune missing rows)"),
        }
        println!("\nContinue? [y/N]: ");

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Import cancelled.");
            return Ok(());
        }
    }

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cli.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let service = FloodImportService::new(FloodDamageRepository::new(pool.clone()), geocoder)
        .with_delay(Duration::from_millis(cli.delay_ms));

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let result = service
        .run(&records, cli.mode, |position, record| {
            pb.set_position(position as u64);
            pb.set_message(record.address.clone());
        })
        .await;

    pool.close().await;

    let stats = result?;
    pb.finish_with_message("done");

    println!("\n=== Flood damage import summary ===");
    println!("Rows in file:   {}", stats.total);
    println!("Imported:       {}", stats.imported);
    println!("Skipped:        {}", stats.skipped);
    if cli.mode == ImportMode::Sync {
        println!("Pruned:         {}", stats.removed);
    }

    info!("Import completed successfully!");
    Ok(())
}
