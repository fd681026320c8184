use clap::Parser;
use miette::{IntoDiagnostic, Result};
use order_engine::application::{OrderHandle, OrderManager};
use order_engine::config::EngineConfig;
use order_engine::domain::order::Order;
use order_engine::domain::ports::{Catalog, CatalogRef, Ledger, LedgerRef, OrderSinkRef};
use order_engine::error::EngineError;
use order_engine::infrastructure::in_memory::{InMemoryCatalog, InMemoryLedger, InMemoryOrderSink};
use order_engine::interfaces::csv::order_reader::{OrderReader, OrderRequest, group_lines};
use order_engine::interfaces::csv::outcome_writer::{OrderOutcome, OutcomeWriter};
use order_engine::interfaces::csv::seed_reader::SeedReader;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Order lines CSV file (order,customer,product,quantity)
    orders: PathBuf,

    /// Products CSV file (id,name,seller,price,quantity)
    #[arg(long)]
    products: PathBuf,

    /// Accounts CSV file (id,role,balance)
    #[arg(long)]
    accounts: PathBuf,

    /// Path to persistent order records (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Seconds to wait for each order to be processed
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Process orders on the main task instead of a background worker
    #[arg(long)]
    sync: bool,
}

fn setup_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .compact()
        .init();
}

fn open_sink(db_path: Option<PathBuf>) -> Result<OrderSinkRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let sink = order_engine::infrastructure::rocksdb::RocksDbOrderSink::open(path)
                .into_diagnostic()?;
            Ok(Arc::new(sink))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryOrderSink::new()))
        }
        None => Ok(Arc::new(InMemoryOrderSink::new())),
    }
}

async fn load_catalog(path: PathBuf) -> Result<InMemoryCatalog> {
    let catalog = InMemoryCatalog::new();
    let file = File::open(path).into_diagnostic()?;
    for product in SeedReader::new(file).products() {
        match product {
            Ok(product) => catalog.insert(product).await.into_diagnostic()?,
            Err(e) => error!(error = %e, "Error reading product"),
        }
    }
    Ok(catalog)
}

async fn load_ledger(path: PathBuf) -> Result<InMemoryLedger> {
    let ledger = InMemoryLedger::new();
    let file = File::open(path).into_diagnostic()?;
    for account in SeedReader::new(file).accounts() {
        match account {
            Ok(account) => ledger.open_account(account).await,
            Err(e) => error!(error = %e, "Error reading account"),
        }
    }
    Ok(ledger)
}

/// Builds an order the way a session would: customer capability first, then
/// each line priced from the current catalog.
async fn build_order(
    request: &OrderRequest,
    catalog: &dyn Catalog,
    ledger: &dyn Ledger,
) -> order_engine::error::Result<Order> {
    let account = ledger
        .find_account(&request.customer)
        .await
        .ok_or_else(|| EngineError::AccountNotFound(request.customer.clone()))?;
    let mut order = Order::for_customer(&account)?;
    for (product_id, quantity) in &request.lines {
        let product = catalog
            .find_by_id(product_id)
            .await
            .ok_or_else(|| EngineError::ProductNotFound(product_id.clone()))?;
        order.add_item(&product, *quantity)?;
    }
    Ok(order)
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let catalog: CatalogRef = Arc::new(load_catalog(cli.products).await?);
    let ledger: LedgerRef = Arc::new(load_ledger(cli.accounts).await?);
    let sink = open_sink(cli.db_path)?;
    let config =
        EngineConfig::default().with_completion_timeout(Duration::from_secs(cli.timeout_secs));
    let manager = OrderManager::with_config(sink, config);

    let file = File::open(cli.orders).into_diagnostic()?;
    let lines = OrderReader::new(file).lines().filter_map(|line| match line {
        Ok(line) => Some(line),
        Err(e) => {
            error!(error = %e, "Error reading order line");
            None
        }
    });

    let mut submitted: Vec<(String, OrderHandle)> = Vec::new();
    for request in group_lines(lines) {
        let built = build_order(&request, catalog.as_ref(), ledger.as_ref()).await;
        match built.and_then(|order| manager.submit(order)) {
            Ok(handle) => submitted.push((request.reference, handle)),
            Err(e) => error!(reference = %request.reference, error = %e, "Error building order"),
        }
    }

    if cli.sync {
        let processed = manager.process_all_pending(catalog, ledger).await;
        info!(processed, "Processed orders synchronously");
    } else {
        manager.start(catalog, ledger).await;
        for (reference, handle) in &submitted {
            if manager.wait_for_completion(handle).await.is_none() {
                warn!(reference = %reference, order_id = %handle.id(), "Timed out waiting for order");
            }
        }
        manager.stop().await;
    }

    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());
    writer
        .write_outcomes(
            submitted
                .iter()
                .map(|(reference, handle)| OrderOutcome::from_handle(reference.clone(), handle)),
        )
        .into_diagnostic()?;

    Ok(())
}
