use crate::client::{
    ClientError, PairClientType, PairDecider, ProtocolClient, SendResponse,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use spowcore::jid::Jid;
use spowcore::types::events::QrEvent;
use spowcore::types::group::GroupInfo;
use spowcore::types::message::{ImageMessage, Message, MessageEvent, PollVote, ReactionMessage};
use spowcore::types::presence::Presence;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Disconnect,
    Logout,
    PairPhone(String),
    Send { to: Jid, body: String },
    Presence(Presence),
    ListGroups,
    Download,
    DecryptPollVote,
    DecryptReaction,
}

/// Scriptable in-memory protocol client that records every call.
#[derive(Default)]
pub struct MockClient {
    calls: Mutex<Vec<Call>>,
    push_name: Mutex<String>,
    groups: Mutex<Option<Vec<GroupInfo>>>,
    failing_users: Mutex<HashSet<String>>,
    fail_all: Mutex<bool>,
    pair_code: Mutex<Option<String>>,
    media: Mutex<Option<Vec<u8>>>,
    poll_vote: Mutex<Option<PollVote>>,
    reaction: Mutex<Option<ReactionMessage>>,
    decider: Mutex<Option<Arc<dyn PairDecider>>>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_push_name(self: Arc<Self>, name: &str) -> Arc<Self> {
        *self.push_name.lock().unwrap() = name.to_string();
        self
    }

    pub fn with_groups(self: Arc<Self>, groups: Vec<GroupInfo>) -> Arc<Self> {
        *self.groups.lock().unwrap() = Some(groups);
        self
    }

    pub fn with_pair_code(self: Arc<Self>, code: &str) -> Arc<Self> {
        *self.pair_code.lock().unwrap() = Some(code.to_string());
        self
    }

    pub fn with_media(self: Arc<Self>, data: &[u8]) -> Arc<Self> {
        *self.media.lock().unwrap() = Some(data.to_vec());
        self
    }

    pub fn with_poll_vote(self: Arc<Self>, vote: PollVote) -> Arc<Self> {
        *self.poll_vote.lock().unwrap() = Some(vote);
        self
    }

    pub fn with_reaction(self: Arc<Self>, reaction: ReactionMessage) -> Arc<Self> {
        *self.reaction.lock().unwrap() = Some(reaction);
        self
    }

    /// Sends to this user fail with a protocol error.
    pub fn failing_for(self: Arc<Self>, user: &str) -> Arc<Self> {
        self.failing_users.lock().unwrap().insert(user.to_string());
        self
    }

    /// Every fallible call fails.
    pub fn failing(self: Arc<Self>) -> Arc<Self> {
        *self.fail_all.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(Jid, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send { to, body } => Some((to, body)),
                _ => None,
            })
            .collect()
    }

    pub fn has_decider(&self) -> bool {
        self.decider.lock().unwrap().is_some()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self) -> Result<(), ClientError> {
        if *self.fail_all.lock().unwrap() {
            Err(ClientError::Protocol("mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
    async fn connect(&self) -> Result<(), ClientError> {
        self.record(Call::Connect);
        self.check()
    }

    async fn disconnect(&self) {
        self.record(Call::Disconnect);
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.record(Call::Logout);
        self.check()
    }

    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>, ClientError> {
        Err(ClientError::AlreadyLoggedIn)
    }

    async fn pair_phone(
        &self,
        phone: &str,
        _show_push_notification: bool,
        _client_type: PairClientType,
        _client_display_name: &str,
    ) -> Result<String, ClientError> {
        self.record(Call::PairPhone(phone.to_string()));
        self.check()?;
        self.pair_code
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClientError::Protocol("phone pairing rejected".to_string()))
    }

    async fn send_message(&self, to: &Jid, message: Message) -> Result<SendResponse, ClientError> {
        self.record(Call::Send {
            to: to.clone(),
            body: message.conversation.unwrap_or_default(),
        });
        self.check()?;
        if self.failing_users.lock().unwrap().contains(&to.user) {
            return Err(ClientError::Protocol(format!("send to {to} failed")));
        }
        Ok(SendResponse {
            id: "3EB0MOCK".to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        })
    }

    async fn send_presence(&self, presence: Presence) -> Result<(), ClientError> {
        self.record(Call::Presence(presence));
        self.check()
    }

    async fn get_joined_groups(&self) -> Result<Vec<GroupInfo>, ClientError> {
        self.record(Call::ListGroups);
        self.check()?;
        self.groups
            .lock()
            .unwrap()
            .clone()
            .ok_or(ClientError::NotConnected)
    }

    async fn download(&self, _image: &ImageMessage) -> Result<Vec<u8>, ClientError> {
        self.record(Call::Download);
        self.check()?;
        self.media
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClientError::Protocol("media not found".to_string()))
    }

    async fn decrypt_poll_vote(&self, _message: &MessageEvent) -> Result<PollVote, ClientError> {
        self.record(Call::DecryptPollVote);
        self.poll_vote
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClientError::Protocol("no poll secret".to_string()))
    }

    async fn decrypt_reaction(
        &self,
        _message: &MessageEvent,
    ) -> Result<ReactionMessage, ClientError> {
        self.record(Call::DecryptReaction);
        self.reaction
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ClientError::Protocol("no message secret".to_string()))
    }

    async fn push_name(&self) -> String {
        self.push_name.lock().unwrap().clone()
    }

    fn set_pair_decider(&self, decider: Arc<dyn PairDecider>) {
        *self.decider.lock().unwrap() = Some(decider);
    }
}
