use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use burst_core::job::{JobOutcome, WorkerEvent};
use burst_db::{DbPool, PgBatchRecordStore, TableName};
use burst_storage::{AnyObjectStore, LocalObjectStore, S3ObjectStore};
use burst_worker::{
    combine, launch, render_local, render_to_store, run_batch, LaunchRequest, LocalRenderRequest,
    PipelineConfig, PipelineContext, StorageBackend,
};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "burst-worker", version, about = "Tiled Mandelbrot rendering pipeline")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a dispatch request for a new job and send it to the dispatcher.
    Launch(EventArgs),
    /// Render and upload one batch of tiles.
    Worker(EventArgs),
    /// Composite all tiles of a finished job into the final image.
    Combine(EventArgs),
    /// Render one tile to a local PNG file, or upload it with `--upload`.
    Render(RenderArgs),
    /// Delete expired batch completion records.
    Purge(PurgeArgs),
}

#[derive(Parser, Debug)]
struct EventArgs {
    /// Event JSON file, or `-` for stdin.
    #[arg(long, default_value = "-")]
    event: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Render parameters JSON file, or `-` for stdin. Defaults apply when
    /// omitted.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long, default_value = "fractal.png")]
    out: PathBuf,

    /// Upload to `{OUTPUT_PREFIX}/fractal.png` in the configured store
    /// instead of writing `--out`.
    #[arg(long)]
    upload: bool,
}

#[derive(Parser, Debug)]
struct PurgeArgs {
    /// Batch record table to purge.
    #[arg(long, default_value = "burst_tasks")]
    table: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("Invalid configuration")?;

    // --- Tracing ---
    let default_filter = if config.debug {
        "burst_worker=debug,burst_storage=debug,burst_render=debug,burst_db=debug"
    } else {
        "burst_worker=info,burst_storage=info,burst_render=info,burst_db=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.cmd {
        Command::Launch(args) => {
            let request: LaunchRequest = read_event(&args.event)?;
            let report = launch(&request, &config).await?;
            print_json(&report)
        }
        Command::Worker(args) => {
            let event: WorkerEvent = read_event(&args.event)?;
            tracing::debug!(event = ?event, "Input event");
            let store = open_store(&config).await?;
            let metadata = PgBatchRecordStore::new(connect_db(&config).await?);
            if let Ok(table) = TableName::parse(&event.tasks_table_name) {
                metadata
                    .ensure_table(&table)
                    .await
                    .context("Failed to prepare batch record table")?;
            }

            let ctx = PipelineContext::new(config, store).with_metadata(metadata);
            let report = run_batch(&ctx, &event).await?;
            print_json(&report)
        }
        Command::Combine(args) => {
            let outcome: JobOutcome = read_event(&args.event)?;
            let store = open_store(&config).await?;
            let ctx = PipelineContext::new(config, store);
            let report = combine(&ctx, &outcome).await?;
            print_json(&report)
        }
        Command::Render(args) => {
            let request: LocalRenderRequest = match &args.params {
                Some(path) => read_event(path)?,
                None => LocalRenderRequest::default(),
            };
            let report = if args.upload {
                let store = open_store(&config).await?;
                render_to_store(&PipelineContext::new(config, store), &request).await?
            } else {
                render_local(&request, &args.out).await?
            };
            print_json(&report)
        }
        Command::Purge(args) => {
            let table = TableName::parse(&args.table)?;
            let metadata = PgBatchRecordStore::new(connect_db(&config).await?);
            let purged = metadata.purge_expired(&table, chrono::Utc::now()).await?;
            print_json(&serde_json::json!({ "table": table.as_str(), "purged": purged }))
        }
    }
}

async fn open_store(config: &PipelineConfig) -> anyhow::Result<AnyObjectStore> {
    let store = match config.storage().context("Invalid storage configuration")? {
        StorageBackend::S3 { bucket } => {
            tracing::info!(bucket = %bucket, "Using S3 object store");
            AnyObjectStore::S3(S3ObjectStore::from_env(bucket).await)
        }
        StorageBackend::Local { root } => {
            tracing::info!(root = %root.display(), "Using local object store");
            AnyObjectStore::Local(LocalObjectStore::new(root))
        }
    };
    Ok(store)
}

async fn connect_db(config: &PipelineConfig) -> anyhow::Result<DbPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;
    let pool = burst_db::create_pool(database_url)
        .await
        .context("Failed to connect to database")?;
    burst_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    burst_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(pool)
}

fn read_event<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("read event '{}'", path.display()))?
    };
    serde_json::from_str(&raw).context("parse event JSON")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
