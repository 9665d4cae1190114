use clap::Parser;
use exchange_desk::application::pricing::PriceAggregator;
use exchange_desk::application::workflow::Workflow;
use exchange_desk::config::Config;
use exchange_desk::domain::ports::{OrderSinkBox, PriceSourceBox};
use exchange_desk::infrastructure::console::ConsoleTransport;
use exchange_desk::infrastructure::csv_sink::CsvOrderSink;
use exchange_desk::infrastructure::in_memory::{FanoutSink, TracingOrderSink};
use exchange_desk::infrastructure::market::sources_from_config;
#[cfg(feature = "storage-rocksdb")]
use exchange_desk::infrastructure::rocksdb::RocksDbOrderSink;
use exchange_desk::interfaces::csv::event_reader::EventReader;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Events CSV file to replay (user,username,kind,payload)
    events: PathBuf,

    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not query price sources; quote from the fallback table only.
    #[arg(long)]
    offline: bool,

    /// Override the configured fee rate (e.g. 0.03).
    #[arg(long)]
    fee_rate: Option<Decimal>,

    /// Append order records to this CSV file.
    #[arg(long)]
    orders_csv: Option<PathBuf>,

    /// Path to persistent order database (optional). Requires the
    /// `storage-rocksdb` feature.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).into_diagnostic()?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    if let Some(fee_rate) = cli.fee_rate {
        config.fee_rate = fee_rate;
    }
    if cli.offline {
        config.pricing.sources.clear();
    }
    if let Some(path) = &cli.orders_csv {
        config.orders.csv_path = Some(path.clone());
    }
    if let Some(path) = &cli.db_path {
        config.orders.rocksdb_path = Some(path.clone());
    }
    config.validate().into_diagnostic()?;
    Ok(config)
}

fn order_sinks(config: &Config) -> Result<Vec<OrderSinkBox>> {
    let mut sinks: Vec<OrderSinkBox> = vec![Box::new(TracingOrderSink)];
    if let Some(path) = &config.orders.csv_path {
        sinks.push(Box::new(CsvOrderSink::open(path).into_diagnostic()?));
    }
    if let Some(path) = &config.orders.rocksdb_path {
        open_rocksdb(path, &mut sinks)?;
    }
    Ok(sinks)
}

#[cfg(feature = "storage-rocksdb")]
fn open_rocksdb(path: &Path, sinks: &mut Vec<OrderSinkBox>) -> Result<()> {
    sinks.push(Box::new(RocksDbOrderSink::open(path).into_diagnostic()?));
    Ok(())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_rocksdb(path: &Path, _sinks: &mut Vec<OrderSinkBox>) -> Result<()> {
    eprintln!(
        "WARNING: Persistent storage requested at {:?}, but 'storage-rocksdb' feature is not enabled. Orders are not persisted to RocksDB.",
        path
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // stdout carries the conversation, logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let sources: Vec<PriceSourceBox> = sources_from_config(&config).into_diagnostic()?;
    let has_sources = !sources.is_empty();
    let prices = Arc::new(PriceAggregator::new(
        sources,
        config.fallback_prices(),
        config.pricing.source_timeout,
        config.pricing.refresh_interval,
    ));
    let refresher = has_sources.then(|| Arc::clone(&prices).spawn_refresh());

    let transport = ConsoleTransport::stdout(config.reviewer_channel.clone());
    let sink = FanoutSink::new(order_sinks(&config)?);
    let workflow = Workflow::new(
        config.desk_settings(),
        prices,
        Box::new(transport),
        Box::new(sink),
    );

    let file = File::open(&cli.events).into_diagnostic()?;
    let base_dir = cli
        .events
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let reader = EventReader::new(file).with_base_dir(base_dir);
    for event in reader.events() {
        match event {
            Ok(event) => workflow.dispatch(event).await,
            Err(e) => eprintln!("Error reading event: {}", e),
        }
    }

    if let Some(handle) = refresher {
        handle.abort();
    }
    info!(
        pending = workflow.registry().len().await,
        "Replay finished"
    );

    Ok(())
}
