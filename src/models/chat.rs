use std::path::Path;

use serde::{Deserialize, Serialize};

use super::enums::{ChatRole, Delivery, WireRole};

/// A file picked by the user that has not been uploaded yet.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalAttachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl std::fmt::Debug for LocalAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAttachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// One turn of a consultation as the client displays it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// RFC 3339 timestamp.
    pub ts: String,
    pub content: String,
    /// Remote upload ids.
    pub attachments: Vec<String>,
    /// Files attached locally and not (yet) confirmed by the server.
    pub local_attachments: Vec<LocalAttachment>,
    pub report_id: Option<String>,
    pub delivery: Delivery,
    /// Client-side id of an optimistic message. Stable across reloads;
    /// `None` for messages that came from the server.
    pub local_id: Option<u64>,
}

impl ChatMessage {
    /// Optimistic patient message appended before the server confirms it.
    pub fn pending_patient(content: impl Into<String>, files: Vec<LocalAttachment>) -> Self {
        Self {
            role: ChatRole::Patient,
            ts: now_rfc3339(),
            content: content.into(),
            attachments: Vec::new(),
            local_attachments: files,
            report_id: None,
            delivery: Delivery::Pending,
            local_id: None,
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Agent,
            ts: now_rfc3339(),
            content: content.into(),
            attachments: Vec::new(),
            local_attachments: Vec::new(),
            report_id: None,
            delivery: Delivery::Sent,
            local_id: None,
        }
    }

    pub fn with_local_id(mut self, local_id: u64) -> Self {
        self.local_id = Some(local_id);
        self
    }

    pub fn with_report(mut self, report_id: impl Into<String>) -> Self {
        self.report_id = Some(report_id.into());
        self
    }

    /// Report id, ignoring blanks the backend sometimes writes.
    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

impl From<WireMessage> for ChatMessage {
    fn from(wire: WireMessage) -> Self {
        Self {
            role: wire.role.to_chat_role(),
            ts: wire.timestamp.unwrap_or_default(),
            content: wire.content,
            attachments: wire.attachments,
            local_attachments: Vec::new(),
            report_id: wire.report_id,
            delivery: Delivery::Sent,
            local_id: None,
        }
    }
}

/// Message as stored in the backend chat document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub content: String,
    #[serde(default, alias = "ts")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub report_id: Option<String>,
}

/// Chat document returned by `GET /chats/{chat_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChatSession {
    pub chat_id: String,
    pub patient_id: String,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A consultation with wire roles already mapped to display roles.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub chat_id: String,
    pub patient_id: String,
    pub messages: Vec<ChatMessage>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
}

impl From<WireChatSession> for ChatSession {
    fn from(wire: WireChatSession) -> Self {
        Self {
            chat_id: wire.chat_id,
            patient_id: wire.patient_id,
            messages: wire.messages.into_iter().map(ChatMessage::from).collect(),
            title: wire.title,
            summary: wire.summary,
            keywords: wire.keywords,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartChatResponse {
    pub chat_id: String,
}

/// Body of `POST /agents/interaction/{chat_id}/message`. Files travel as
/// upload ids, never as bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageReply {
    pub reply: String,
    /// Not sent by current backends; kept when present.
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub keywords: Vec<String>,
}

/// Result row of `GET /search/chats`. Without a query the backend returns
/// whole chat documents; with one it returns ranked hits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SearchHit {
    Ranked(RankedHit),
    Chat(WireChatSession),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedHit {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
