use crate::client::ProtocolClient;
use crate::commands::CommandDispatcher;
use crate::config::BridgeConfig;
use crate::handlers::EventRouter;
use crate::history_sync::HistorySyncWriter;
use crate::pairing::{PairRejectHandle, PairingCoordinator};
use crate::share::ShareRelay;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Everything one bridge process shares between its components.
///
/// Built once at startup; components get clones of the handles they need.
pub struct Session<C: ProtocolClient> {
    pub client: Arc<C>,
    pub config: Arc<BridgeConfig>,
    awaiting_pair: Arc<AtomicBool>,
    history: Arc<HistorySyncWriter>,
}

impl<C: ProtocolClient> Session<C> {
    /// `started_at` is the process start time in unix seconds; it names every
    /// history dump of this run.
    pub fn new(client: Arc<C>, config: BridgeConfig, started_at: i64) -> Self {
        let history = Arc::new(HistorySyncWriter::new(config.data_dir.clone(), started_at));
        Self {
            client,
            config: Arc::new(config),
            awaiting_pair: Arc::new(AtomicBool::new(false)),
            history,
        }
    }

    /// Registers the pairing coordinator with the client and returns the
    /// handle used to reject an incoming link.
    pub fn install_pairing(&self) -> PairRejectHandle {
        let (coordinator, handle) = PairingCoordinator::new(
            self.config.pair_reject_window,
            self.awaiting_pair.clone(),
        );
        self.client.set_pair_decider(Arc::new(coordinator));
        handle
    }

    pub fn router(&self) -> Arc<EventRouter<C>> {
        Arc::new(EventRouter::new(
            self.client.clone(),
            self.history.clone(),
            self.config.data_dir.clone(),
        ))
    }

    pub fn dispatcher<W: Write>(&self, out: W) -> CommandDispatcher<C, W> {
        CommandDispatcher::new(self.client.clone(), out)
    }

    pub fn relay(&self) -> ShareRelay<C> {
        ShareRelay::new(self.client.clone())
    }
}
