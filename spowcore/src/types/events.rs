use crate::appstate::PatchName;
use crate::jid::{Jid, MessageId};
use crate::types::message::{MessageEvent, MessageSource};
use crate::types::presence::ReceiptType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Every inbound event the protocol client can deliver.
///
/// The router matches on this exhaustively, so a new variant has to be
/// handled there before the crate compiles again.
#[derive(Debug, Clone, Serialize)]
pub enum Event {
    Connected(Connected),
    Disconnected(Disconnected),
    PairSuccess(PairSuccess),
    LoggedOut(LoggedOut),
    StreamReplaced(StreamReplaced),
    PushNameSetting(PushNameSetting),

    Message(Box<MessageEvent>),
    Receipt(Receipt),
    Presence(PresenceUpdate),

    HistorySync(Box<HistorySync>),
    AppState(AppState),
    AppStateSyncComplete(AppStateSyncComplete),

    KeepAliveTimeout(KeepAliveTimeout),
    KeepAliveRestored(KeepAliveRestored),
    Blocklist(Blocklist),
}

#[derive(Debug, Clone, Serialize)]
pub struct Connected;

#[derive(Debug, Clone, Serialize)]
pub struct Disconnected;

#[derive(Debug, Clone, Serialize)]
pub struct PairSuccess {
    pub id: Jid,
    pub business_name: String,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedOut {
    pub on_connect: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamReplaced;

/// The account's own push name changed, possibly from another device.
#[derive(Debug, Clone, Serialize)]
pub struct PushNameSetting {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub from_full_sync: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub source: MessageSource,
    pub message_ids: Vec<MessageId>,
    pub timestamp: DateTime<Utc>,
    pub r#type: ReceiptType,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresenceUpdate {
    pub from: Jid,
    pub unavailable: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppState {
    pub index: Vec<String>,
    pub sync_action_value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppStateSyncComplete {
    pub name: PatchName,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeepAliveTimeout {
    pub error_count: i32,
    pub last_success: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeepAliveRestored;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlocklistAction {
    Default,
    Modify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlocklistChangeAction {
    Block,
    Unblock,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlocklistChange {
    pub jid: Jid,
    pub action: BlocklistChangeAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct Blocklist {
    pub action: BlocklistAction,
    pub dhash: String,
    pub prev_dhash: String,
    pub changes: Vec<BlocklistChange>,
}

/// Bulk history blob delivered after login. The bridge never looks inside;
/// the complete protocol payload is carried and persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistorySync {
    pub data: serde_json::Value,
}

impl HistorySync {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }
}

/// Items emitted on the QR channel while the device is unpaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QrEvent {
    Code { code: String, timeout: Duration },
    Success,
    Timeout,
    ClientOutdated,
    ScannedWithoutMultidevice,
    Error(String),
}

impl fmt::Display for QrEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QrEvent::Code { .. } => f.write_str("code"),
            QrEvent::Success => f.write_str("success"),
            QrEvent::Timeout => f.write_str("timeout"),
            QrEvent::ClientOutdated => f.write_str("err-client-outdated"),
            QrEvent::ScannedWithoutMultidevice => f.write_str("err-scanned-without-multidevice"),
            QrEvent::Error(e) => write!(f, "error: {e}"),
        }
    }
}
