use anyhow::Context;
use chrono::{Local, Utc};
use clap::Parser;
use log::{error, info};
use spow_whatsapp_bridge::app::{self, Outcome};
use spow_whatsapp_bridge::client::ProtocolClient;
use spow_whatsapp_bridge::config::{BridgeConfig, DbDialect};
use spow_whatsapp_bridge::dry_run::DryRunClient;
use spow_whatsapp_bridge::session::Session;
use spowcore::command::Invocation;
use spowcore::types::events::Event;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;

/// Bridge between s+ow and WhatsApp.
///
/// Usage:
///   spow-whatsapp-bridge login                  # stay connected, type r to reject a pairing
///   spow-whatsapp-bridge pair-phone 15551234567 # link by phone number
///   spow-whatsapp-bridge send <jid> <text...>
///   spow-whatsapp-bridge list
///   echo "wa:123@s.whatsapp.net" | spow-whatsapp-bridge
#[derive(Parser, Debug)]
#[command(version, about, verbatim_doc_comment)]
struct Cli {
    /// Enable debug logs
    #[arg(long)]
    debug: bool,

    /// Database dialect
    #[arg(long, value_enum, default_value_t = DbDialect::Sqlite3)]
    db_dialect: DbDialect,

    /// Database address
    #[arg(long, default_value = "file:mdtest.db?_foreign_keys=on")]
    db_address: String,

    /// Request full (1 year) history sync when logging in
    #[arg(long)]
    request_full_sync: bool,

    /// Working directory for history dumps and saved media
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Staged message relayed when no command is given
    #[arg(long)]
    message_file: Option<PathBuf>,

    /// Log protocol calls instead of connecting
    #[arg(long)]
    dry_run: bool,

    /// Command and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn into_config(self) -> (BridgeConfig, Vec<String>) {
        let defaults = BridgeConfig::default();
        let config = BridgeConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            message_path: self.message_file.unwrap_or(defaults.message_path),
            db_dialect: self.db_dialect,
            db_address: self.db_address,
            debug: self.debug,
            request_full_sync: self.request_full_sync,
            pair_reject_window: defaults.pair_reject_window,
        };
        (config, self.args)
    }
}

fn main() {
    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let (config, args) = cli.into_config();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level()))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{:<5}] [{}] - {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    if let Err(e) = enter_data_dir(&config) {
        error!("{e:#}");
        std::process::exit(1);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to build tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let started_at = Utc::now().timestamp();
    let invocation = Invocation::from_args(&args);
    let result = rt.block_on(async {
        if dry_run {
            info!(
                "Using dry-run client (store: {:?} {}, full history sync: {})",
                config.db_dialect, config.db_address, config.request_full_sync
            );
            let (client, events) = DryRunClient::open("s+ow", Vec::new());
            return serve(client, events, config, started_at, invocation).await;
        }
        serve_backend(config, started_at, invocation).await
    });
    // stdin reads are blocking and must not hold the process open.
    rt.shutdown_background();

    match result {
        Ok(Outcome::Finished) => {}
        Ok(Outcome::StreamReplaced) => std::process::exit(0),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn enter_data_dir(config: &BridgeConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "failed to create data directory {}",
            config.data_dir.display()
        )
    })?;
    std::env::set_current_dir(&config.data_dir).with_context(|| {
        format!(
            "failed to enter data directory {}",
            config.data_dir.display()
        )
    })
}

async fn serve<C: ProtocolClient>(
    client: Arc<C>,
    events: mpsc::Receiver<Event>,
    config: BridgeConfig,
    started_at: i64,
    invocation: Invocation,
) -> anyhow::Result<Outcome> {
    let session = Session::new(client, config, started_at);
    let input = BufReader::new(tokio::io::stdin());
    let stdout = std::io::stdout().lock();
    app::run(&session, events, invocation, input, stdout).await
}

#[cfg(feature = "whatsapp")]
async fn serve_backend(
    config: BridgeConfig,
    started_at: i64,
    invocation: Invocation,
) -> anyhow::Result<Outcome> {
    let (client, events) =
        spow_whatsapp_bridge::whatsapp::WhatsAppClient::open(&config).await?;
    serve(client, events, config, started_at, invocation).await
}

#[cfg(not(feature = "whatsapp"))]
async fn serve_backend(
    config: BridgeConfig,
    _started_at: i64,
    _invocation: Invocation,
) -> anyhow::Result<Outcome> {
    anyhow::bail!(
        "built without the WhatsApp backend, cannot open the {:?} store at {}; rebuild with --features whatsapp or pass --dry-run",
        config.db_dialect,
        config.db_address
    )
}
