use crate::client::ProtocolClient;
use crate::history_sync::HistorySyncWriter;
use crate::presence::PresenceManager;
use log::{Level, debug, info, log, warn};
use spowcore::types::events::{Event, PresenceUpdate, Receipt};
use spowcore::types::presence::ReceiptType;
use std::future::Future;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

/// Why [`EventRouter::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterExit {
    /// Another client took over the session; the process should exit now.
    StreamReplaced,
    /// The client dropped its event sender.
    StreamClosed,
}

/// Turns inbound protocol events into side effects.
///
/// Slow work (attachment downloads, history dumps) runs on spawned tasks so
/// the event stream keeps moving. Every failure is logged and the router
/// carries on with the next event.
pub struct EventRouter<C: ProtocolClient> {
    pub(crate) client: Arc<C>,
    presence: PresenceManager<C>,
    history: Arc<HistorySyncWriter>,
    pub(crate) media_dir: PathBuf,
    tasks: Mutex<JoinSet<()>>,
}

impl<C: ProtocolClient> EventRouter<C> {
    pub fn new(client: Arc<C>, history: Arc<HistorySyncWriter>, media_dir: PathBuf) -> Self {
        Self {
            presence: PresenceManager::new(client.clone()),
            client,
            history,
            media_dir,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Drains `events` until the stream closes or is replaced.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<Event>) -> RouterExit {
        while let Some(event) = events.recv().await {
            if self.handle(event).await.is_break() {
                return RouterExit::StreamReplaced;
            }
        }
        debug!("Event stream closed");
        self.drain().await;
        RouterExit::StreamClosed
    }

    pub async fn handle(self: &Arc<Self>, event: Event) -> ControlFlow<()> {
        match event {
            Event::AppStateSyncComplete(evt) => {
                if evt.name.is_critical_block() {
                    self.presence.announce_available().await;
                }
            }
            Event::Connected(_) | Event::PushNameSetting(_) => {
                self.presence.announce_available().await;
            }
            Event::StreamReplaced(_) => {
                info!("Stream replaced by another client");
                return ControlFlow::Break(());
            }
            Event::Message(evt) => {
                let router = self.clone();
                self.spawn(async move { router.handle_message(*evt).await })
                    .await;
            }
            Event::Receipt(receipt) => log_receipt(&receipt),
            Event::Presence(update) => log_presence(&update),
            Event::HistorySync(data) => {
                let record = self.history.reserve();
                let history = self.history.clone();
                self.spawn(async move { history.persist(record, data).await })
                    .await;
            }
            Event::AppState(evt) => {
                debug!("App state event: {:?} / {}", evt.index, evt.sync_action_value);
            }
            Event::KeepAliveTimeout(evt) => {
                debug!(
                    "Keepalive timeout event: {} errors, last success at {}",
                    evt.error_count, evt.last_success
                );
            }
            Event::KeepAliveRestored(_) => debug!("Keepalive restored"),
            Event::Blocklist(evt) => info!("Blocklist event: {evt:?}"),
            Event::PairSuccess(evt) => info!(
                "Paired as {} (platform: {:?}, business name: {:?})",
                evt.id, evt.platform, evt.business_name
            ),
            Event::LoggedOut(evt) => warn!(
                "Logged out (on connect: {}, reason: {})",
                evt.on_connect, evt.reason
            ),
            Event::Disconnected(_) => info!("Disconnected"),
        }
        ControlFlow::Continue(())
    }

    /// Waits for every side effect spawned so far.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!("Event handler task failed: {e}");
            }
        }
    }

    async fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                warn!("Event handler task failed: {e}");
            }
        }
        tasks.spawn(work);
    }
}

fn log_receipt(receipt: &Receipt) {
    let (level, line) = describe_receipt(receipt);
    log!(level, "{line}");
}

fn describe_receipt(receipt: &Receipt) -> (Level, String) {
    let source = receipt.source.source_string();
    let ids = receipt.message_ids.join(", ");
    match &receipt.r#type {
        t if t.is_read() => (
            Level::Info,
            format!("{ids} was read by {source} at {}", receipt.timestamp),
        ),
        ReceiptType::Delivered => (
            Level::Info,
            format!("{ids} was delivered to {source} at {}", receipt.timestamp),
        ),
        other => (
            Level::Debug,
            format!("Receipt {other:?} for {ids} from {source}"),
        ),
    }
}

fn log_presence(update: &PresenceUpdate) {
    if !update.unavailable {
        info!("{} is now online", update.from);
        return;
    }
    match update.last_seen {
        Some(last_seen) => info!("{} is now offline (last seen: {last_seen})", update.from),
        None => info!("{} is now offline", update.from),
    }
}
