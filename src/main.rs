//! # kds-relay CLI
//!
//! Runs the kitchen print relay and manages its settings.
//!
//! ## Usage
//!
//! ```bash
//! # Point the relay at the kitchen server
//! kds-relay config set base_url https://kitchen.local/app
//!
//! # Print directly over Bluetooth on 80mm paper
//! kds-relay config set use_vendor_printer false
//! kds-relay config set printer_mac 00:11:62:AA:BB:CC
//! kds-relay config set paper_width_mm 80
//!
//! # Check the printer
//! kds-relay test-print
//!
//! # Poll until Ctrl-C
//! RUST_LOG=kds_relay=debug kds-relay run
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use kds_relay::{
    Engine, Preferences, RelayError,
    client::build_http_client,
    dispatch::Printer,
    notify::Notifier,
    prefs,
    settings::{self, Settings},
    surface::SpoolSurface,
    transport::RfcommConnector,
};

/// kds-relay - Kitchen print job relay
#[derive(Parser, Debug)]
#[command(name = "kds-relay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Preferences file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    prefs: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll for print jobs until interrupted
    Run {
        /// Kitchen server base URL (saved to preferences)
        #[arg(long)]
        base_url: Option<String>,

        /// Polling interval in seconds, 5-300 (saved to preferences)
        #[arg(long)]
        interval: Option<u64>,

        /// Accept invalid TLS certificates from the kitchen server
        #[arg(long)]
        insecure: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show configuration summary and dedup state
    Status,

    /// Print a sample receipt through the configured print mode
    TestPrint,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show every setting
    Show,

    /// Change one setting
    Set { key: String, value: String },

    /// Reset one setting to its default
    Unset { key: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RelayError> {
    let cli = Cli::parse();

    let path = cli
        .prefs
        .or_else(prefs::default_path)
        .ok_or_else(|| RelayError::Config("no config directory, pass --prefs".to_string()))?;
    let prefs = Arc::new(Preferences::open(&path)?);

    match cli.command {
        Commands::Run {
            base_url,
            interval,
            insecure,
        } => {
            if let Some(url) = base_url {
                prefs.put(settings::KEY_BASE_URL, url)?;
            }
            if let Some(secs) = interval {
                prefs.put(settings::KEY_POLLING_INTERVAL, secs)?;
            }

            let settings = Settings::load(&prefs);
            if settings.base_url.is_none() {
                tracing::warn!("base_url is not set; polls are skipped until it is");
            }

            let (notifier, print_requests) = notifier();
            let engine = Arc::new(build_engine(Arc::clone(&prefs), insecure, notifier)?);
            let handle = Arc::clone(&engine).spawn(print_requests);

            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down");
            let stats = handle.stop().await;
            println!(
                "Stopped after {} cycles ({} resyncs)",
                stats.cycles, stats.resyncs
            );
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", path.display());
                for key in settings::USER_KEYS {
                    match prefs.get(key) {
                        Some(value) => println!("{} = {}", key, value),
                        None => println!("{} = (unset)", key),
                    }
                }
            }
            ConfigAction::Set { key, value } => {
                let value = parse_setting(&key, &value)?;
                prefs.put(&key, value)?;
                println!("Saved {}", key);
            }
            ConfigAction::Unset { key } => {
                if !settings::USER_KEYS.contains(&key.as_str()) {
                    return Err(unknown_setting(&key));
                }
                prefs.remove(&key)?;
                println!("Reset {}", key);
            }
        },

        Commands::Status => {
            let settings = Settings::load(&prefs);
            let seen = kds_relay::seen::SeenStore::load(Arc::clone(&prefs));
            println!("base url:       {}", settings.base_url.as_deref().unwrap_or("(unset)"));
            println!("interval:       {}s", settings.polling_interval.as_secs());
            println!(
                "print mode:     {}",
                if settings.vendor_mode {
                    format!("vendor ({})", settings.vendor_integration)
                } else {
                    format!(
                        "direct ({}, {}mm)",
                        settings.printer_device.as_deref().unwrap_or("first bound device"),
                        settings.paper_width.mm()
                    )
                }
            );
            println!("printed:        {}", seen.printed_len());
            println!("acknowledged:   {}", seen.acknowledged_len());
        }

        Commands::TestPrint => {
            let (notifier, _) = notifier();
            let engine = build_engine(prefs, false, notifier)?;
            println!("Printing test receipt...");
            engine.test_print().await?;
            println!("Printed successfully!");
        }
    }

    Ok(())
}

fn build_engine(
    prefs: Arc<Preferences>,
    insecure: bool,
    notifier: Arc<dyn Notifier>,
) -> Result<Engine, RelayError> {
    let spool_dir = Settings::load(&prefs)
        .spool_dir
        .unwrap_or_else(|| std::env::temp_dir().join("kds-relay-spool"));

    Ok(Engine::new(
        prefs,
        build_http_client(insecure)?,
        notifier,
        Printer::new(Arc::new(RfcommConnector)),
        Arc::new(SpoolSurface::new(spool_dir)),
    ))
}

type PrintRequests = Option<tokio::sync::mpsc::UnboundedReceiver<kds_relay::JobId>>;

#[cfg(feature = "desktop-notify")]
fn notifier() -> (Arc<dyn Notifier>, PrintRequests) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (
        Arc::new(kds_relay::notify::DesktopNotifier::new(Some(tx))),
        Some(rx),
    )
}

#[cfg(not(feature = "desktop-notify"))]
fn notifier() -> (Arc<dyn Notifier>, PrintRequests) {
    (Arc::new(kds_relay::notify::LogNotifier), None)
}

/// Validate a `config set` key and convert the value to its stored type.
fn parse_setting(key: &str, raw: &str) -> Result<Value, RelayError> {
    let invalid = |expected: &str| {
        RelayError::Config(format!("{} expects {}, got '{}'", key, expected, raw))
    };

    match key {
        settings::KEY_POLLING_INTERVAL | settings::KEY_PAPER_WIDTH => raw
            .trim()
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("a whole number")),
        settings::KEY_SOUND_ENABLED | settings::KEY_VENDOR_PRINTER => raw
            .trim()
            .parse::<bool>()
            .map(Value::from)
            .map_err(|_| invalid("true or false")),
        settings::KEY_PRINTER_MAC => {
            let value = raw.trim();
            if value.is_empty()
                || value.starts_with('/')
                || kds_relay::transport::bluetooth::is_valid_mac(value)
            {
                Ok(Value::from(value))
            } else {
                Err(invalid("a Bluetooth MAC or a device path"))
            }
        }
        _ if settings::USER_KEYS.contains(&key) => Ok(Value::from(raw.trim())),
        _ => Err(unknown_setting(key)),
    }
}

fn unknown_setting(key: &str) -> RelayError {
    RelayError::Config(format!(
        "unknown setting '{}' (known: {})",
        key,
        settings::USER_KEYS.join(", ")
    ))
}
