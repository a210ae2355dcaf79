//! [`ProtocolClient`] backed by the whatsapp-rust multi-device client.

use crate::client::{
    ClientError, PairClientType, PairDecider, PairingDecision, PairingRequest, ProtocolClient,
    SendResponse,
};
use crate::config::BridgeConfig;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use spowcore::jid::{Jid, Server};
use spowcore::types::events::{
    Connected, Disconnected, Event, HistorySync, LoggedOut, PairSuccess, PresenceUpdate,
    PushNameSetting, QrEvent, Receipt, StreamReplaced,
};
use spowcore::types::group::GroupInfo;
use spowcore::types::message::{
    ImageMessage, Message, MessageEvent, MessageInfo, MessageSource, PollVote, ReactionMessage,
};
use spowcore::types::presence::{Presence, ReceiptType};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use wacore::pair_code::PlatformId;
use wacore::proto_helpers::MessageExt;
use wacore::types::events::Event as WaEvent;
use wacore::types::message::EditAttribute;
use wacore::types::presence::{Presence as WaPresence, ReceiptType as WaReceiptType};
use wacore_binary::jid::Jid as WaJid;
use waproto::whatsapp as wa;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust::pair_code::PairCodeOptions;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const QR_CHANNEL_CAPACITY: usize = 8;

/// State the event handler shares with the client handle.
#[derive(Default)]
struct Shared {
    qr: Mutex<Option<mpsc::Sender<QrEvent>>>,
    decider: Mutex<Option<Arc<dyn PairDecider>>>,
}

pub struct WhatsAppClient {
    client: Arc<Client>,
    bot: tokio::sync::Mutex<Bot>,
    runner: Mutex<Option<tokio::task::JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl WhatsAppClient {
    /// Opens the session store and loads (or creates) the device.
    ///
    /// Both steps are fatal for the process; the caller exits on error.
    pub async fn open(config: &BridgeConfig) -> anyhow::Result<(Arc<Self>, mpsc::Receiver<Event>)> {
        let address = config
            .sqlite_address()
            .context("failed to open session storage")?;
        let store = SqliteStore::new(address)
            .await
            .map_err(|e| anyhow!("failed to open session storage at {address}: {e}"))?;
        info!("SQLite session storage opened at {address}");
        if config.request_full_sync {
            warn!("Full history sync cannot be requested from this backend; the server default applies");
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared::default());
        let handler_shared = shared.clone();

        let bot = Bot::builder()
            .with_backend(Arc::new(store))
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event, client| {
                let tx = tx.clone();
                let shared = handler_shared.clone();
                async move { shared.dispatch(event, client, &tx).await }
            })
            .build()
            .await
            .context("failed to get device")?;

        let client = Arc::new(Self {
            client: bot.client(),
            bot: tokio::sync::Mutex::new(bot),
            runner: Mutex::new(None),
            shared,
        });
        Ok((client, rx))
    }
}

impl Shared {
    async fn dispatch(&self, event: WaEvent, client: Arc<Client>, tx: &mpsc::Sender<Event>) {
        if let Some(qr) = qr_event(&event) {
            let sender = self.qr.lock().ok().and_then(|qr| qr.clone());
            if let Some(sender) = sender {
                let _ = sender.send(qr).await;
            }
        }
        if let WaEvent::PairSuccess(success) = &event {
            self.confirm_pair(success, &client).await;
        }
        match bridge_event(&event) {
            Some(evt) => {
                if tx.send(evt).await.is_err() {
                    debug!("Event receiver dropped");
                }
            }
            None => debug!("Ignoring backend event: {event:?}"),
        }
    }

    /// The backend reports a link only once the server confirmed it, so a
    /// rejection here tears the connection down instead of refusing the link.
    async fn confirm_pair(&self, success: &wacore::types::events::PairSuccess, client: &Client) {
        let decider = self.decider.lock().ok().and_then(|d| d.clone());
        let Some(decider) = decider else {
            return;
        };
        let request = PairingRequest {
            subject: jid(&success.id),
            platform: success.platform.clone(),
            display_name: success.business_name.clone(),
        };
        if decider.decide(request).await == PairingDecision::Reject {
            warn!("Disconnecting rejected device link; remove it from the phone's linked devices");
            client.disconnect().await;
        }
    }
}

fn jid(jid: &WaJid) -> Jid {
    let raw = jid.to_string();
    raw.parse()
        .unwrap_or_else(|_| Jid::new("", Server::Other(raw)))
}

fn wa_jid(jid: &Jid) -> Result<WaJid, ClientError> {
    jid.to_string()
        .parse()
        .map_err(|e| ClientError::Protocol(format!("invalid JID {jid}: {e:?}")))
}

fn receipt_type(r#type: &WaReceiptType) -> ReceiptType {
    match r#type {
        WaReceiptType::Delivered => ReceiptType::Delivered,
        WaReceiptType::Sender => ReceiptType::Sender,
        WaReceiptType::Retry => ReceiptType::Retry,
        WaReceiptType::Read => ReceiptType::Read,
        WaReceiptType::ReadSelf => ReceiptType::ReadSelf,
        WaReceiptType::Played => ReceiptType::Played,
        WaReceiptType::PlayedSelf => ReceiptType::PlayedSelf,
        WaReceiptType::ServerError => ReceiptType::ServerError,
        WaReceiptType::Inactive => ReceiptType::Inactive,
        WaReceiptType::PeerMsg => ReceiptType::PeerMsg,
        WaReceiptType::HistorySync => ReceiptType::HistorySync,
        WaReceiptType::Other(other) => ReceiptType::Other(other.clone()),
    }
}

fn source(source: &wacore::types::message::MessageSource) -> MessageSource {
    MessageSource {
        chat: jid(&source.chat),
        sender: jid(&source.sender),
        is_from_me: source.is_from_me,
        is_group: source.is_group,
    }
}

/// Keeps the parts of a protocol message the bridge models; the rest of the
/// payload is dropped by the conversion.
fn message(message: &wa::Message) -> Option<Message> {
    let value = serde_json::to_value(message.get_base_message()).ok()?;
    serde_json::from_value(value).ok()
}

fn message_event(msg: &wa::Message, info: &wacore::types::message::MessageInfo) -> MessageEvent {
    MessageEvent {
        info: MessageInfo {
            source: source(&info.source),
            id: info.id.clone(),
            r#type: info.r#type.clone(),
            push_name: info.push_name.clone(),
            timestamp: info.timestamp,
            category: info.category.clone(),
        },
        message: Box::new(message(msg).unwrap_or_default()),
        is_ephemeral: msg.is_ephemeral(),
        is_view_once: msg.is_view_once(),
        is_view_once_v2: msg.view_once_message_v2.is_some(),
        is_document_with_caption: msg.document_with_caption_message.is_some(),
        is_edit: info.edit != EditAttribute::Empty,
    }
}

fn qr_event(event: &WaEvent) -> Option<QrEvent> {
    match event {
        WaEvent::PairingQrCode { code, timeout } => Some(QrEvent::Code {
            code: code.clone(),
            timeout: *timeout,
        }),
        WaEvent::PairSuccess(_) => Some(QrEvent::Success),
        WaEvent::PairError(e) => Some(QrEvent::Error(e.error.clone())),
        WaEvent::QrScannedWithoutMultidevice(_) => Some(QrEvent::ScannedWithoutMultidevice),
        WaEvent::ClientOutdated(_) => Some(QrEvent::ClientOutdated),
        _ => None,
    }
}

fn bridge_event(event: &WaEvent) -> Option<Event> {
    let evt = match event {
        WaEvent::Connected(_) => Event::Connected(Connected),
        WaEvent::Disconnected(_) => Event::Disconnected(Disconnected),
        WaEvent::StreamReplaced(_) => Event::StreamReplaced(StreamReplaced),
        WaEvent::PairSuccess(success) => Event::PairSuccess(PairSuccess {
            id: jid(&success.id),
            business_name: success.business_name.clone(),
            platform: success.platform.clone(),
        }),
        WaEvent::LoggedOut(logged_out) => Event::LoggedOut(LoggedOut {
            on_connect: logged_out.on_connect,
            reason: format!("{:?}", logged_out.reason),
        }),
        WaEvent::SelfPushNameUpdated(update) => Event::PushNameSetting(PushNameSetting {
            timestamp: Utc::now(),
            name: update.new_name.clone(),
            from_full_sync: false,
        }),
        WaEvent::Message(msg, info) => Event::Message(Box::new(message_event(msg, info))),
        WaEvent::Receipt(receipt) => Event::Receipt(Receipt {
            source: source(&receipt.source),
            message_ids: receipt.message_ids.clone(),
            timestamp: receipt.timestamp,
            r#type: receipt_type(&receipt.r#type),
        }),
        WaEvent::Presence(update) => Event::Presence(PresenceUpdate {
            from: jid(&update.from),
            unavailable: update.unavailable,
            last_seen: update.last_seen,
        }),
        WaEvent::HistorySync(data) => match serde_json::to_value(data) {
            Ok(value) => Event::HistorySync(Box::new(HistorySync::new(value))),
            Err(e) => {
                warn!("Failed to convert history sync: {e}");
                return None;
            }
        },
        _ => return None,
    };
    Some(evt)
}

fn platform_id(client_type: PairClientType) -> PlatformId {
    match client_type {
        PairClientType::Chrome => PlatformId::Chrome,
    }
}

fn wa_image(image: &ImageMessage) -> wa::message::ImageMessage {
    wa::message::ImageMessage {
        url: image.url.clone(),
        mimetype: image.mimetype.clone(),
        caption: image.caption.clone(),
        file_sha256: image.file_sha256.clone(),
        file_length: image.file_length,
        media_key: image.media_key.clone(),
        file_enc_sha256: image.file_enc_sha256.clone(),
        direct_path: image.direct_path.clone(),
        ..Default::default()
    }
}

#[async_trait]
impl ProtocolClient for WhatsAppClient {
    async fn connect(&self) -> Result<(), ClientError> {
        let mut bot = self.bot.lock().await;
        let running = self
            .runner
            .lock()
            .map(|runner| runner.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false);
        if running {
            return self.client.connect().await.map_err(ClientError::Other);
        }
        let handle = bot.run().await.map_err(ClientError::Other)?;
        if let Ok(mut runner) = self.runner.lock() {
            *runner = Some(handle);
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    async fn logout(&self) -> Result<(), ClientError> {
        Err(ClientError::Protocol(
            "logout is not supported by this backend; unlink the device from the phone"
                .to_string(),
        ))
    }

    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>, ClientError> {
        if self.client.get_pn().await.is_some() {
            return Err(ClientError::AlreadyLoggedIn);
        }
        let (tx, rx) = mpsc::channel(QR_CHANNEL_CAPACITY);
        let mut slot = self
            .shared
            .qr
            .lock()
            .map_err(|_| ClientError::Protocol("QR channel state poisoned".to_string()))?;
        *slot = Some(tx);
        Ok(rx)
    }

    async fn pair_phone(
        &self,
        phone: &str,
        show_push_notification: bool,
        client_type: PairClientType,
        client_display_name: &str,
    ) -> Result<String, ClientError> {
        let options = PairCodeOptions {
            phone_number: phone.to_string(),
            show_push_notification,
            custom_code: None,
            platform_id: platform_id(client_type),
            platform_display: client_display_name.to_string(),
        };
        self.client
            .pair_with_code(options)
            .await
            .map_err(|e| ClientError::Protocol(e.to_string()))
    }

    async fn send_message(&self, to: &Jid, message: Message) -> Result<SendResponse, ClientError> {
        let content = wa::Message {
            conversation: message.conversation,
            ..Default::default()
        };
        let id = self.client.send_message(wa_jid(to)?, content).await?;
        Ok(SendResponse {
            id,
            timestamp: Utc::now(),
        })
    }

    async fn send_presence(&self, presence: Presence) -> Result<(), ClientError> {
        let presence = match presence {
            Presence::Available => WaPresence::Available,
        };
        Ok(self.client.send_presence(presence).await?)
    }

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, ClientError> {
        let groups = self.client.groups().get_participating().await?;
        Ok(groups
            .into_values()
            .map(|group| GroupInfo::new(jid(&group.id), group.subject))
            .collect())
    }

    async fn download(&self, image: &ImageMessage) -> Result<Vec<u8>, ClientError> {
        Ok(self.client.download(&wa_image(image)).await?)
    }

    async fn decrypt_poll_vote(&self, message: &MessageEvent) -> Result<PollVote, ClientError> {
        Err(ClientError::Protocol(format!(
            "no poll secret stored for vote {}",
            message.info.id
        )))
    }

    async fn decrypt_reaction(
        &self,
        message: &MessageEvent,
    ) -> Result<ReactionMessage, ClientError> {
        Err(ClientError::Protocol(format!(
            "no message secret stored for reaction {}",
            message.info.id
        )))
    }

    async fn push_name(&self) -> String {
        self.client.get_push_name().await
    }

    fn set_pair_decider(&self, decider: Arc<dyn PairDecider>) {
        if let Ok(mut slot) = self.shared.decider.lock() {
            *slot = Some(decider);
        }
    }
}
