use crate::client::ProtocolClient;
use log::{debug, info, warn};
use spowcore::types::presence::Presence;
use std::sync::Arc;

/// Keeps our outgoing presence in step with the account's push name.
///
/// Presence is sent on connect and whenever the push name changes so that
/// outgoing messages always carry the right name.
pub struct PresenceManager<C: ProtocolClient> {
    client: Arc<C>,
}

impl<C: ProtocolClient> PresenceManager<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Marks us available. Returns whether presence was actually sent.
    pub async fn announce_available(&self) -> bool {
        if self.client.push_name().await.is_empty() {
            debug!("Not sending presence: push name is not known yet");
            return false;
        }

        match self.client.send_presence(Presence::Available).await {
            Ok(()) => {
                info!("Marked self as available");
                true
            }
            Err(e) => {
                warn!("Failed to send available presence: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, MockClient};

    #[tokio::test]
    async fn test_skips_without_push_name() {
        let client = MockClient::new();
        let presence = PresenceManager::new(client.clone());

        assert!(!presence.announce_available().await);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sends_available_with_push_name() {
        let client = MockClient::new().with_push_name("Mark");
        let presence = PresenceManager::new(client.clone());

        assert!(presence.announce_available().await);
        assert_eq!(client.calls(), vec![Call::Presence(Presence::Available)]);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let client = MockClient::new().with_push_name("Mark").failing();
        let presence = PresenceManager::new(client.clone());

        assert!(!presence.announce_available().await);
        assert_eq!(client.calls(), vec![Call::Presence(Presence::Available)]);
    }
}
