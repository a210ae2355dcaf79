use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spowcore::jid::{Jid, MessageId};
use spowcore::types::events::QrEvent;
use spowcore::types::group::GroupInfo;
use spowcore::types::message::{ImageMessage, Message, MessageEvent, PollVote, ReactionMessage};
use spowcore::types::presence::Presence;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("client is not connected")]
    NotConnected,
    #[error("the store already contains a device ID, QR pairing is not needed")]
    AlreadyLoggedIn,
    #[error("request timed out")]
    Timeout,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
}

/// Browser identity presented when linking with a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairClientType {
    #[default]
    Chrome,
}

impl fmt::Display for PairClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PairClientType::Chrome => "Chrome",
        };
        f.write_str(name)
    }
}

/// An inbound device-link attempt awaiting a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRequest {
    pub subject: Jid,
    pub platform: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingDecision {
    Accept,
    Reject,
}

/// Called by the protocol client during the pairing handshake, before the
/// new device is confirmed.
#[async_trait]
pub trait PairDecider: Send + Sync {
    async fn decide(&self, request: PairingRequest) -> PairingDecision;
}

/// The multi-device protocol client the bridge drives.
///
/// Inbound events are not part of this trait: whoever opens the client hands
/// out the receiving half of its event channel alongside it.
#[async_trait]
pub trait ProtocolClient: Send + Sync + 'static {
    async fn connect(&self) -> Result<(), ClientError>;

    async fn disconnect(&self);

    async fn logout(&self) -> Result<(), ClientError>;

    /// QR codes for linking this device. Fails with
    /// [`ClientError::AlreadyLoggedIn`] when a session already exists.
    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>, ClientError>;

    /// Starts phone-number linking and returns the code to type on the phone.
    async fn pair_phone(
        &self,
        phone: &str,
        show_push_notification: bool,
        client_type: PairClientType,
        client_display_name: &str,
    ) -> Result<String, ClientError>;

    async fn send_message(&self, to: &Jid, message: Message) -> Result<SendResponse, ClientError>;

    async fn send_presence(&self, presence: Presence) -> Result<(), ClientError>;

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, ClientError>;

    /// Fetches and decrypts an image attachment.
    async fn download(&self, image: &ImageMessage) -> Result<Vec<u8>, ClientError>;

    async fn decrypt_poll_vote(&self, message: &MessageEvent) -> Result<PollVote, ClientError>;

    async fn decrypt_reaction(&self, message: &MessageEvent)
    -> Result<ReactionMessage, ClientError>;

    /// The account's own display name, empty until known.
    async fn push_name(&self) -> String;

    fn set_pair_decider(&self, decider: Arc<dyn PairDecider>);
}
