use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_NAME: &str = "s+ow-whatsapp-bridge";
pub const PAIR_REJECT_WINDOW: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DbDialect {
    Sqlite3,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreConfigError {
    #[error("{0:?} session storage is not supported, use sqlite3")]
    UnsupportedDialect(DbDialect),
    #[error("database address is empty")]
    EmptyAddress,
}

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Working directory; history dumps and saved images land here.
    pub data_dir: PathBuf,
    /// Staged message body read by the share relay.
    pub message_path: PathBuf,
    pub db_dialect: DbDialect,
    pub db_address: String,
    pub debug: bool,
    pub request_full_sync: bool,
    pub pair_reject_window: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        Self {
            data_dir: home.join(".local").join("share").join(DATA_DIR_NAME),
            message_path: home.join(".cache").join("s+ow").join("message"),
            db_dialect: DbDialect::Sqlite3,
            db_address: "file:mdtest.db?_foreign_keys=on".to_string(),
            debug: false,
            request_full_sync: false,
            pair_reject_window: PAIR_REJECT_WINDOW,
        }
    }
}

impl BridgeConfig {
    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    /// Address of the SQLite session store. Other dialects are rejected.
    pub fn sqlite_address(&self) -> Result<&str, StoreConfigError> {
        if self.db_dialect != DbDialect::Sqlite3 {
            return Err(StoreConfigError::UnsupportedDialect(self.db_dialect));
        }
        match self.db_address.trim() {
            "" => Err(StoreConfigError::EmptyAddress),
            address => Ok(address),
        }
    }
}
