use crate::client::{
    ClientError, PairClientType, PairDecider, ProtocolClient, SendResponse,
};
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use spowcore::jid::Jid;
use spowcore::types::events::{Connected, Disconnected, Event, QrEvent};
use spowcore::types::group::GroupInfo;
use spowcore::types::message::{ImageMessage, Message, MessageEvent, PollVote, ReactionMessage};
use spowcore::types::presence::Presence;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Protocol client that logs every request instead of talking to the network.
///
/// Sends always succeed and are kept so callers can inspect them. `connect`
/// emits [`Event::Connected`] and `disconnect` closes the event stream.
pub struct DryRunClient {
    events: Mutex<Option<mpsc::Sender<Event>>>,
    push_name: String,
    groups: Vec<GroupInfo>,
    sent: Mutex<Vec<(Jid, Message)>>,
    next_id: AtomicU64,
    decider: Mutex<Option<Arc<dyn PairDecider>>>,
}

impl DryRunClient {
    /// Opens the client along with the receiving half of its event stream.
    pub fn open(push_name: &str, groups: Vec<GroupInfo>) -> (Arc<Self>, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let client = Arc::new(Self {
            events: Mutex::new(Some(tx)),
            push_name: push_name.to_string(),
            groups,
            sent: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            decider: Mutex::new(None),
        });
        (client, rx)
    }

    pub fn sent(&self) -> Vec<(Jid, Message)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn has_pair_decider(&self) -> bool {
        self.decider.lock().map(|d| d.is_some()).unwrap_or(false)
    }

    fn sender(&self) -> Option<mpsc::Sender<Event>> {
        self.events.lock().ok().and_then(|tx| tx.clone())
    }

    fn lock_err<T>(_: T) -> ClientError {
        ClientError::Protocol("dry-run state poisoned".to_string())
    }
}

#[async_trait]
impl ProtocolClient for DryRunClient {
    async fn connect(&self) -> Result<(), ClientError> {
        info!("[dry-run] connect");
        if let Some(tx) = self.sender() {
            // Nobody listening just means the session is shutting down.
            let _ = tx.send(Event::Connected(Connected)).await;
        }
        Ok(())
    }

    async fn disconnect(&self) {
        info!("[dry-run] disconnect");
        let tx = self.events.lock().ok().and_then(|mut tx| tx.take());
        if let Some(tx) = tx {
            let _ = tx.send(Event::Disconnected(Disconnected)).await;
        }
    }

    async fn logout(&self) -> Result<(), ClientError> {
        info!("[dry-run] logout");
        Ok(())
    }

    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>, ClientError> {
        Err(ClientError::AlreadyLoggedIn)
    }

    async fn pair_phone(
        &self,
        phone: &str,
        show_push_notification: bool,
        client_type: PairClientType,
        client_display_name: &str,
    ) -> Result<String, ClientError> {
        info!(
            "[dry-run] pair phone {phone} as {client_type} ({client_display_name:?}, notify: {show_push_notification})"
        );
        Ok("DRYR-UN00".to_string())
    }

    async fn send_message(&self, to: &Jid, message: Message) -> Result<SendResponse, ClientError> {
        info!(
            "[dry-run] send to {to}: {:?}",
            message.text_content().unwrap_or_default()
        );
        let id = format!("DRYRUN{:06}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sent
            .lock()
            .map_err(Self::lock_err)?
            .push((to.clone(), message));
        Ok(SendResponse {
            id,
            timestamp: Utc::now(),
        })
    }

    async fn send_presence(&self, presence: Presence) -> Result<(), ClientError> {
        info!("[dry-run] presence {}", presence.as_str());
        Ok(())
    }

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, ClientError> {
        info!("[dry-run] list groups");
        Ok(self.groups.clone())
    }

    async fn download(&self, image: &ImageMessage) -> Result<Vec<u8>, ClientError> {
        info!("[dry-run] download {:?}", image.direct_path);
        Err(ClientError::Protocol("media download is unavailable in dry-run mode".to_string()))
    }

    async fn decrypt_poll_vote(&self, _message: &MessageEvent) -> Result<PollVote, ClientError> {
        Err(ClientError::Protocol("no poll secret in dry-run mode".to_string()))
    }

    async fn decrypt_reaction(
        &self,
        _message: &MessageEvent,
    ) -> Result<ReactionMessage, ClientError> {
        Err(ClientError::Protocol("no message secret in dry-run mode".to_string()))
    }

    async fn push_name(&self) -> String {
        self.push_name.clone()
    }

    fn set_pair_decider(&self, decider: Arc<dyn PairDecider>) {
        if let Ok(mut slot) = self.decider.lock() {
            *slot = Some(decider);
        }
    }
}
