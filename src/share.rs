use crate::client::ProtocolClient;
use log::{debug, error, info};
use spowcore::jid::{Jid, parse_recipient};
use spowcore::share::ShareJob;
use spowcore::types::message::Message;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Outcome of one relay run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub sent: Vec<Jid>,
    pub failed: Vec<Jid>,
    /// The target that could not be parsed and stopped the run.
    pub aborted_at: Option<String>,
}

/// Forwards a staged message to every `wa:` target of a share line.
pub struct ShareRelay<C: ProtocolClient> {
    client: Arc<C>,
}

impl<C: ProtocolClient> ShareRelay<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Sends `body` to each routable target in order.
    ///
    /// An unparsable target ends the run; targets after it are not tried.
    /// A failed send is logged and the next target is attempted.
    pub async fn run(&self, body: &str, target_line: &str) -> RelayReport {
        let job = ShareJob::new(body, target_line);
        let mut report = RelayReport::default();

        for raw in job.routable_targets() {
            let target = match parse_recipient(raw) {
                Ok(jid) => jid,
                Err(e) => {
                    error!("Invalid JID {raw:?}: {e}");
                    report.aborted_at = Some(raw.to_string());
                    return report;
                }
            };

            match self
                .client
                .send_message(&target, Message::text(job.body.as_str()))
                .await
            {
                Ok(resp) => {
                    info!("Message sent to {target} (server timestamp: {})", resp.timestamp);
                    report.sent.push(target);
                }
                Err(e) => {
                    error!("Error sending message to {target}: {e}");
                    report.failed.push(target);
                }
            }
        }

        if report.sent.is_empty() && report.failed.is_empty() {
            debug!("No WhatsApp targets in share line");
        }
        report
    }
}

/// Reads the staged message body.
pub async fn read_staged_body(path: &Path) -> io::Result<String> {
    tokio::fs::read_to_string(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, MockClient};
    use spowcore::jid::Server;

    #[tokio::test]
    async fn test_bad_target_aborts_remaining() {
        let client = MockClient::new();
        let relay = ShareRelay::new(client.clone());

        let report = relay
            .run(
                "hi",
                "wa:111@s.whatsapp.net,wa:bad-jid,wa:222@s.whatsapp.net",
            )
            .await;

        assert_eq!(
            client.sent(),
            vec![(Jid::new("111", Server::User), "hi".to_string())]
        );
        assert_eq!(report.aborted_at.as_deref(), Some("bad-jid"));
        assert_eq!(report.sent, vec![Jid::new("111", Server::User)]);
    }

    #[tokio::test]
    async fn test_send_failure_continues() {
        let client = MockClient::new().failing_for("111");
        let relay = ShareRelay::new(client.clone());

        let report = relay
            .run(" staged body\n", "wa:111, tg:555 ,wa:222@s.whatsapp.net")
            .await;

        assert_eq!(report.failed, vec![Jid::new("111", Server::User)]);
        assert_eq!(report.sent, vec![Jid::new("222", Server::User)]);
        assert!(report.aborted_at.is_none());
        assert!(
            client
                .sent()
                .iter()
                .all(|(_, body)| body == "staged body")
        );
    }

    #[tokio::test]
    async fn test_line_without_wa_targets_sends_nothing() {
        let client = MockClient::new();
        let relay = ShareRelay::new(client.clone());

        let report = relay.run("x", "tg:1,mail:someone").await;

        assert_eq!(report, RelayReport::default());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_group_targets_are_accepted() {
        let client = MockClient::new();
        let relay = ShareRelay::new(client.clone());

        relay.run("x", "wa:120363001@g.us").await;

        assert_eq!(
            client.calls(),
            vec![Call::Send {
                to: Jid::new("120363001", Server::Group),
                body: "x".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_read_staged_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message");
        std::fs::write(&path, "hello\n").unwrap();

        assert_eq!(read_staged_body(&path).await.unwrap(), "hello\n");
        assert!(read_staged_body(&dir.path().join("missing")).await.is_err());
    }
}
