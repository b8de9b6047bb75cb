use chrono::Duration;
use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use pi_checkout::application::engine::CheckoutEngine;
use pi_checkout::application::router::CallbackRouter;
use pi_checkout::config::{CheckoutConfig, DEFAULT_ORIGIN};
use pi_checkout::domain::order::TransitionPolicy;
use pi_checkout::domain::ports::CheckoutStoreBox;
use pi_checkout::domain::session::Session;
use pi_checkout::error::CheckoutError;
use pi_checkout::infrastructure::in_memory::InMemoryStore;
use pi_checkout::interfaces::catalog::read_catalog;
use pi_checkout::interfaces::csv::callback_reader::{CallbackReader, LogEntry};
use pi_checkout::interfaces::csv::order_writer::OrderWriter;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Orders in a terminal state ignore further callbacks
    Strict,
    /// Every callback overwrites the order
    LastWriteWins,
}

impl From<Policy> for TransitionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Strict => TransitionPolicy::Strict,
            Policy::LastWriteWins => TransitionPolicy::LastWriteWins,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Payment-provider callback log (CSV)
    input: PathBuf,

    /// Product catalog (JSON array) loaded before replaying the log
    #[arg(long, env = "PI_CHECKOUT_CATALOG")]
    catalog: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "PI_CHECKOUT_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Origin download links are built against
    #[arg(long, env = "PI_CHECKOUT_ORIGIN", default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// How callbacks on finished orders are handled
    #[arg(long, env = "PI_CHECKOUT_POLICY", value_enum, default_value_t = Policy::Strict)]
    policy: Policy,

    /// Number of callback workers
    #[arg(long, env = "PI_CHECKOUT_SHARDS", default_value_t = 4)]
    shards: usize,

    /// Download window for products that do not set one
    #[arg(long, default_value_t = 168)]
    default_expiry_hours: u32,

    /// Download allowance for products that do not set one
    #[arg(long, default_value_t = 5)]
    default_max_downloads: u32,

    /// Report orders still pending after this many minutes
    #[arg(long)]
    stale_after_minutes: Option<i64>,
}

fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<CheckoutStoreBox> {
    use pi_checkout::infrastructure::rocksdb::RocksDBStore;

    if let Some(db_path) = db_path {
        return Ok(Box::new(RocksDBStore::open(db_path).into_diagnostic()?));
    }
    Ok(Box::new(InMemoryStore::new()))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<CheckoutStoreBox> {
    if db_path.is_some() {
        tracing::warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = CheckoutConfig {
        origin: cli.origin,
        default_expiry_hours: cli.default_expiry_hours,
        default_max_downloads: cli.default_max_downloads,
        policy: cli.policy.into(),
    };
    let stale_after = cli
        .stale_after_minutes
        .map(|minutes| {
            Duration::try_minutes(minutes).ok_or_else(|| {
                CheckoutError::ValidationError(format!("--stale-after-minutes {} is out of range", minutes))
            })
        })
        .transpose()
        .into_diagnostic()?;
    let engine = Arc::new(CheckoutEngine::new(open_store(cli.db_path)?, config));

    if let Some(catalog) = cli.catalog {
        let products = read_catalog(File::open(catalog).into_diagnostic()?).into_diagnostic()?;
        info!(count = products.len(), "loading product catalog");
        for product in products {
            engine.add_product(product).await.into_diagnostic()?;
        }
    }

    // Replay the callback log
    let router = CallbackRouter::new(engine.clone(), cli.shards, 1024);
    let file = File::open(cli.input).into_diagnostic()?;
    for entry in CallbackReader::new(file).entries() {
        match entry {
            Ok(LogEntry::Checkout {
                order_id,
                product_id,
                buyer_id,
            }) => {
                let session = match Session::new(buyer_id.as_str(), buyer_id.as_str()) {
                    Ok(session) => session,
                    Err(e) => {
                        error!("Error starting checkout: {}", e);
                        continue;
                    }
                };
                if let Err(e) = engine
                    .initiate_with_id(order_id, &session, &product_id, None)
                    .await
                {
                    error!(notification = e.notification(), "Error starting checkout: {}", e);
                }
            }
            Ok(LogEntry::Callback(event)) => {
                router.submit(event).await.into_diagnostic()?;
            }
            Err(e) => {
                error!("Error reading callback: {}", e);
            }
        }
    }
    let stats = router.shutdown().await.into_diagnostic()?;
    info!(
        applied = stats.applied,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        errors = stats.errors,
        "callback log replayed"
    );

    for product in engine.products().await.into_diagnostic()? {
        info!(product_id = %product.id, downloads = product.download_count, "product sales");
    }

    if let Some(older_than) = stale_after {
        let stale = engine.stale_pending(older_than).await.into_diagnostic()?;
        info!(count = stale.len(), "stale pending orders");
    }

    // Output final order table, oldest first
    let mut orders = engine.all_orders().await.into_diagnostic()?;
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer
        .write_orders(&orders, &engine.config().origin)
        .into_diagnostic()?;

    Ok(())
}
