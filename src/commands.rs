use crate::client::{ClientError, PairClientType, ProtocolClient};
use log::{debug, error, info};
use spowcore::command::Command;
use spowcore::jid::Jid;
use spowcore::types::message::Message;
use std::io::Write;
use std::sync::Arc;

/// Display name shown on the phone when linking by phone number.
pub const PAIR_CLIENT_DISPLAY_NAME: &str = "Chrome (Linux)";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The process must stop with a failure status.
    #[error("{0}")]
    Fatal(#[source] ClientError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Runs one-shot verbs against the protocol client.
///
/// Results meant for the user (pairing codes, group listings) go to `out`;
/// everything else is logged.
pub struct CommandDispatcher<C: ProtocolClient, W: Write> {
    client: Arc<C>,
    out: W,
}

impl<C: ProtocolClient, W: Write> CommandDispatcher<C, W> {
    pub fn new(client: Arc<C>, out: W) -> Self {
        Self { client, out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Parses and runs `verb`. Usage mistakes are logged and produce no
    /// protocol traffic.
    pub async fn dispatch<S: AsRef<str>>(
        &mut self,
        verb: &str,
        args: &[S],
    ) -> Result<(), DispatchError> {
        match Command::parse(verb, args) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => {
                debug!("Ignoring unknown command {verb:?}");
                Ok(())
            }
            Err(e) => {
                error!("{e}");
                Ok(())
            }
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<(), DispatchError> {
        debug!("Running {}", command.verb());
        match command {
            Command::PairPhone { phone } => self.pair_phone(&phone).await,
            Command::Reconnect => {
                self.client.disconnect().await;
                if let Err(e) = self.client.connect().await {
                    error!("Failed to connect: {e}");
                }
                Ok(())
            }
            Command::Logout => {
                match self.client.logout().await {
                    Ok(()) => info!("Successfully logged out"),
                    Err(e) => error!("Error logging out: {e}"),
                }
                Ok(())
            }
            Command::ListGroups => self.list_groups().await,
            Command::Send { target, body } => {
                self.send(&target, body).await;
                Ok(())
            }
        }
    }

    async fn pair_phone(&mut self, phone: &str) -> Result<(), DispatchError> {
        let code = self
            .client
            .pair_phone(
                phone,
                true,
                PairClientType::Chrome,
                PAIR_CLIENT_DISPLAY_NAME,
            )
            .await
            .map_err(DispatchError::Fatal)?;
        writeln!(self.out, "Linking code: {code}")?;
        Ok(())
    }

    async fn list_groups(&mut self) -> Result<(), DispatchError> {
        let groups = match self.client.get_joined_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                error!("Failed to get group list: {e}");
                return Ok(());
            }
        };
        for group in &groups {
            writeln!(self.out, "{}", group.to_list_line())?;
        }
        Ok(())
    }

    async fn send(&self, target: &Jid, body: String) {
        match self.client.send_message(target, Message::text(body)).await {
            Ok(resp) => info!(
                "Message sent to {target} (server timestamp: {})",
                resp.timestamp
            ),
            Err(e) => error!("Error sending message to {target}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, MockClient};
    use spowcore::jid::Server;
    use spowcore::types::group::GroupInfo;

    fn dispatcher(client: &Arc<MockClient>) -> CommandDispatcher<MockClient, Vec<u8>> {
        CommandDispatcher::new(client.clone(), Vec::new())
    }

    #[tokio::test]
    async fn test_send_without_body_makes_no_calls() {
        let client = MockClient::new();
        let mut d = dispatcher(&client);

        d.dispatch("send", &["15551234567"]).await.unwrap();
        d.dispatch("send", &[] as &[&str]).await.unwrap();

        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_joins_words() {
        let client = MockClient::new();
        let mut d = dispatcher(&client);

        d.dispatch("send", &["15551234567@s.whatsapp.net", "hello", "world"])
            .await
            .unwrap();

        assert_eq!(
            client.sent(),
            vec![(
                Jid::new("15551234567", Server::User),
                "hello world".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_send_failure_is_not_fatal() {
        let client = MockClient::new().failing();
        let mut d = dispatcher(&client);

        assert!(d.dispatch("SEND", &["123", "hi"]).await.is_ok());
        assert_eq!(client.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_list_prints_one_line_per_group() {
        let client = MockClient::new().with_groups(vec![
            GroupInfo::new(Jid::new("120363001", Server::Group), "Team"),
            GroupInfo::new(Jid::new("120363002", Server::Group), "Ops"),
        ]);
        let mut d = dispatcher(&client);

        d.dispatch("list", &[] as &[&str]).await.unwrap();

        let out = String::from_utf8(d.into_output()).unwrap();
        assert_eq!(out, "120363001@g.us\tTeam\n120363002@g.us\tOps\n");
    }

    #[tokio::test]
    async fn test_list_failure_prints_nothing() {
        let client = MockClient::new();
        let mut d = dispatcher(&client);

        d.dispatch("list", &[] as &[&str]).await.unwrap();

        assert!(d.into_output().is_empty());
        assert_eq!(client.calls(), vec![Call::ListGroups]);
    }

    #[tokio::test]
    async fn test_pair_phone_prints_linking_code() {
        let client = MockClient::new().with_pair_code("ABCD-EFGH");
        let mut d = dispatcher(&client);

        d.dispatch("pair-phone", &["15551234567"]).await.unwrap();

        assert_eq!(client.calls(), vec![Call::PairPhone("15551234567".into())]);
        assert_eq!(d.into_output(), b"Linking code: ABCD-EFGH\n");
    }

    #[tokio::test]
    async fn test_pair_phone_failure_is_fatal() {
        let client = MockClient::new();
        let mut d = dispatcher(&client);

        let err = d.dispatch("pair-phone", &["15551234567"]).await.unwrap_err();
        assert!(matches!(err, DispatchError::Fatal(ClientError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_pair_phone_usage_error() {
        let client = MockClient::new().with_pair_code("X");
        let mut d = dispatcher(&client);

        d.dispatch("pair-phone", &["1", "2"]).await.unwrap();
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_disconnects_first() {
        let client = MockClient::new();
        let mut d = dispatcher(&client);

        d.dispatch("reconnect", &[] as &[&str]).await.unwrap();
        assert_eq!(client.calls(), vec![Call::Disconnect, Call::Connect]);
    }

    #[tokio::test]
    async fn test_logout_and_unknown_verb() {
        let client = MockClient::new();
        let mut d = dispatcher(&client);

        d.dispatch("frobnicate", &["x"]).await.unwrap();
        d.dispatch("Logout", &[] as &[&str]).await.unwrap();
        assert_eq!(client.calls(), vec![Call::Logout]);
    }
}
