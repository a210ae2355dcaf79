use crate::client::{PairDecider, PairingDecision, PairingRequest};
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// Accepts device links unless rejected out-of-band within a short window.
pub struct PairingCoordinator {
    reject_rx: Mutex<mpsc::Receiver<bool>>,
    awaiting: Arc<AtomicBool>,
    window: Duration,
}

/// Sending half used by the interactive input loop to reject a pending pair.
#[derive(Clone)]
pub struct PairRejectHandle {
    reject_tx: mpsc::Sender<bool>,
    awaiting: Arc<AtomicBool>,
}

impl PairingCoordinator {
    pub fn new(window: Duration, awaiting: Arc<AtomicBool>) -> (Self, PairRejectHandle) {
        let (reject_tx, reject_rx) = mpsc::channel(1);
        let coordinator = Self {
            reject_rx: Mutex::new(reject_rx),
            awaiting: awaiting.clone(),
            window,
        };
        (coordinator, PairRejectHandle { reject_tx, awaiting })
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting.load(Ordering::SeqCst)
    }

    pub async fn wait_for_decision(&self, request: &PairingRequest) -> PairingDecision {
        let mut reject_rx = self.reject_rx.lock().await;
        // A signal left over from an earlier request must not decide this one.
        while reject_rx.try_recv().is_ok() {}

        self.awaiting.store(true, Ordering::SeqCst);
        let awaiting = self.awaiting.clone();
        scopeguard::defer! {
            awaiting.store(false, Ordering::SeqCst);
        }

        info!(
            "Pairing {} (platform: {:?}, business name: {:?}). Type r within {} seconds to reject pair",
            request.subject,
            request.platform,
            request.display_name,
            self.window.as_secs()
        );

        let rejected = tokio::select! {
            // A closed channel disables this arm and leaves the timer to decide.
            Some(signal) = reject_rx.recv() => signal,
            _ = tokio::time::sleep(self.window) => false,
        };

        if rejected {
            info!("Rejecting pair");
            PairingDecision::Reject
        } else {
            info!("Accepting pair");
            PairingDecision::Accept
        }
    }
}

#[async_trait]
impl PairDecider for PairingCoordinator {
    async fn decide(&self, request: PairingRequest) -> PairingDecision {
        self.wait_for_decision(&request).await
    }
}

impl PairRejectHandle {
    pub fn is_awaiting(&self) -> bool {
        self.awaiting.load(Ordering::SeqCst)
    }

    /// Delivers a reject (`true`) or explicit accept (`false`) signal.
    /// Returns `false` when no pairing is pending or a signal is already queued.
    pub fn signal(&self, reject: bool) -> bool {
        self.is_awaiting() && self.reject_tx.try_send(reject).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spowcore::jid::{Jid, Server};

    fn request() -> PairingRequest {
        PairingRequest {
            subject: Jid::new("15551234567", Server::User),
            platform: "chrome".to_string(),
            display_name: "Laptop".to_string(),
        }
    }

    fn coordinator() -> (Arc<PairingCoordinator>, PairRejectHandle) {
        let (coordinator, handle) =
            PairingCoordinator::new(Duration::from_secs(3), Arc::new(AtomicBool::new(false)));
        (Arc::new(coordinator), handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepts_on_timeout() {
        let (coordinator, handle) = coordinator();
        let started = tokio::time::Instant::now();

        let decision = coordinator.wait_for_decision(&request()).await;

        assert_eq!(decision, PairingDecision::Accept);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(!handle.is_awaiting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_just_before_deadline() {
        let (coordinator, handle) = coordinator();
        let task = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.wait_for_decision(&request()).await }
        });

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(handle.is_awaiting());
        assert!(handle.signal(true));

        assert_eq!(task.await.unwrap(), PairingDecision::Reject);
        assert!(!handle.is_awaiting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_signal_accepts_early() {
        let (coordinator, handle) = coordinator();
        let task = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.wait_for_decision(&request()).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        let signalled_at = tokio::time::Instant::now();
        assert!(handle.signal(false));

        assert_eq!(task.await.unwrap(), PairingDecision::Accept);
        assert!(signalled_at.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_full_window_when_handle_dropped() {
        let (coordinator, handle) = coordinator();
        drop(handle);
        let started = tokio::time::Instant::now();

        let decision = coordinator.wait_for_decision(&request()).await;

        assert_eq!(decision, PairingDecision::Accept);
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(!coordinator.is_awaiting());
    }

    #[tokio::test]
    async fn test_signal_ignored_when_not_awaiting() {
        let (coordinator, handle) = coordinator();
        assert!(!coordinator.is_awaiting());
        assert!(!handle.signal(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_reset_when_decision_is_cancelled() {
        let (coordinator, handle) = coordinator();
        let task = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.wait_for_decision(&request()).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_awaiting());
        task.abort();
        let _ = task.await;
        assert!(!handle.is_awaiting());
    }
}
