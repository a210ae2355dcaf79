use crate::jid::{Jid, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSource {
    pub chat: Jid,
    pub sender: Jid,
    pub is_from_me: bool,
    pub is_group: bool,
}

impl MessageSource {
    /// `sender in chat` for group traffic, the bare chat otherwise.
    pub fn source_string(&self) -> String {
        if self.sender != self.chat {
            format!("{} in {}", self.sender, self.chat)
        } else {
            self.chat.to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub source: MessageSource,
    pub id: MessageId,
    pub r#type: String,
    pub push_name: String,
    pub timestamp: DateTime<Utc>,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKey {
    pub remote_jid: Option<String>,
    pub from_me: Option<bool>,
    pub id: Option<String>,
    pub participant: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMessage {
    pub url: Option<String>,
    pub mimetype: Option<String>,
    pub caption: Option<String>,
    pub file_sha256: Option<Vec<u8>>,
    pub file_length: Option<u64>,
    pub media_key: Option<Vec<u8>>,
    pub file_enc_sha256: Option<Vec<u8>>,
    pub direct_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollEncValue {
    pub enc_payload: Option<Vec<u8>>,
    pub enc_iv: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollUpdateMessage {
    pub poll_creation_message_key: Option<MessageKey>,
    pub vote: Option<PollEncValue>,
    pub sender_timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncReactionMessage {
    pub target_message_key: Option<MessageKey>,
    pub enc_payload: Option<Vec<u8>>,
    pub enc_iv: Option<Vec<u8>>,
}

/// Plaintext payload of a chat message. Only the parts the bridge acts on
/// are modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub conversation: Option<String>,
    pub image_message: Option<Box<ImageMessage>>,
    pub poll_update_message: Option<Box<PollUpdateMessage>>,
    pub enc_reaction_message: Option<Box<EncReactionMessage>>,
}

impl Message {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            conversation: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        self.conversation.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub info: MessageInfo,
    pub message: Box<Message>,
    pub is_ephemeral: bool,
    pub is_view_once: bool,
    pub is_view_once_v2: bool,
    pub is_document_with_caption: bool,
    pub is_edit: bool,
}

impl MessageEvent {
    /// Comma separated metadata used when logging an incoming message.
    pub fn meta_summary(&self) -> String {
        let mut parts = vec![
            format!("pushname: {}", self.info.push_name),
            format!("timestamp: {}", self.info.timestamp),
        ];
        if !self.info.r#type.is_empty() {
            parts.push(format!("type: {}", self.info.r#type));
        }
        if !self.info.category.is_empty() {
            parts.push(format!("category: {}", self.info.category));
        }
        if self.is_view_once {
            parts.push("view once".to_string());
        }
        if self.is_ephemeral {
            parts.push("ephemeral".to_string());
        }
        if self.is_view_once_v2 {
            parts.push("ephemeral (v2)".to_string());
        }
        if self.is_document_with_caption {
            parts.push("document with caption".to_string());
        }
        if self.is_edit {
            parts.push("edit".to_string());
        }
        parts.join(", ")
    }
}

/// Result of decrypting a poll vote: SHA-256 hashes of the selected options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVote {
    pub selected_options: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionMessage {
    pub key: Option<MessageKey>,
    pub text: Option<String>,
    pub sender_timestamp_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> MessageEvent {
        MessageEvent {
            info: MessageInfo {
                id: "3EB0ABC".to_string(),
                push_name: "Alice".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                ..Default::default()
            },
            message: Box::new(Message::text("hi")),
            ..Default::default()
        }
    }

    #[test]
    fn test_meta_summary_minimal() {
        let evt = sample_event();
        assert_eq!(
            evt.meta_summary(),
            "pushname: Alice, timestamp: 2024-03-01 12:00:00 UTC"
        );
    }

    #[test]
    fn test_meta_summary_flags_in_order() {
        let mut evt = sample_event();
        evt.info.r#type = "media".to_string();
        evt.info.category = "peer".to_string();
        evt.is_view_once = true;
        evt.is_ephemeral = true;
        evt.is_edit = true;
        assert_eq!(
            evt.meta_summary(),
            "pushname: Alice, timestamp: 2024-03-01 12:00:00 UTC, type: media, \
             category: peer, view once, ephemeral, edit"
        );
    }

    #[test]
    fn test_source_string() {
        let chat: Jid = "123@g.us".parse().unwrap();
        let sender: Jid = "456@s.whatsapp.net".parse().unwrap();
        let group = MessageSource {
            chat: chat.clone(),
            sender: sender.clone(),
            is_group: true,
            ..Default::default()
        };
        assert_eq!(group.source_string(), "456@s.whatsapp.net in 123@g.us");

        let direct = MessageSource {
            chat: sender.clone(),
            sender,
            ..Default::default()
        };
        assert_eq!(direct.source_string(), "456@s.whatsapp.net");
    }
}
