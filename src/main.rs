use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paygate_ledger::application::engine::PaymentEngine;
use paygate_ledger::config::{AuthorizerMode, Config, LogConfig};
use paygate_ledger::domain::ports::LedgerStoreRef;
use paygate_ledger::infrastructure::authorizer;
use paygate_ledger::infrastructure::in_memory::InMemoryLedgerStore;
#[cfg(feature = "storage-rocksdb")]
use paygate_ledger::infrastructure::rocksdb::RocksDBStore;
use paygate_ledger::interfaces::csv::account_writer::AccountWriter;
use paygate_ledger::interfaces::csv::command_reader::CommandReader;
use paygate_ledger::interfaces::csv::command_runner::CommandRunner;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV script of ledger commands
    input: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// How card payments, refunds and deposits are authorized
    #[arg(long, value_enum)]
    authorizer: Option<AuthorizerMode>,

    /// Endpoint queried when the authorizer mode is `http`
    #[arg(long)]
    authorizer_url: Option<String>,

    /// Upper bound on waiting for a row lock, in milliseconds
    #[arg(long)]
    lock_timeout_ms: Option<u64>,
}

impl Cli {
    fn load_config(&self) -> paygate_ledger::error::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env()?;
        if let Some(path) = &self.db_path {
            config.storage.db_path = Some(path.clone());
        }
        if let Some(mode) = self.authorizer {
            config.authorizer.mode = mode;
        }
        if let Some(url) = &self.authorizer_url {
            config.authorizer.url = Some(url.clone());
        }
        if let Some(ms) = self.lock_timeout_ms {
            config.ledger.lock_timeout_ms = ms;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            info!(path = %path.display(), "Opening RocksDB store");
            let store = RocksDBStore::open(path)?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config.log);

    let store = open_store(config.storage.db_path.clone())?;
    let authorizer = authorizer::from_config(&config.authorizer)?;
    let engine =
        PaymentEngine::new(store, authorizer).with_lock_timeout(config.ledger.lock_timeout());

    // Replay the script; a bad row is logged and skipped
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut runner = CommandRunner::new(&engine);
    for (row, command) in reader.commands().enumerate() {
        let row = row + 1;
        match command {
            Ok(command) => {
                let kind = command.r#type;
                if let Err(e) = runner.run(command).await {
                    warn!(row, command = ?kind, error = %e, "Command rejected");
                }
            }
            Err(e) => {
                warn!(row, error = %e, "Error reading command");
            }
        }
    }

    let accounts = engine.accounts().await?;
    info!(accounts = accounts.len(), "Replay finished");
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(&accounts)?;

    Ok(())
}
