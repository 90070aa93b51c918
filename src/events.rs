//! Domain event types exchanged over the bus.
//!
//! The payloads at the transport boundary carry opaque handles only; the
//! engine never talks to the chat network directly.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Punishment;

/// Discriminant used for subscription routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MemberMessageSent,
    PunishmentChecked,
    CommandExecuted,
    SendMessage,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberMessageSent => write!(f, "MEMBER_MESSAGE_SENT"),
            Self::PunishmentChecked => write!(f, "PUNISHMENT_CHECKED"),
            Self::CommandExecuted => write!(f, "COMMAND_EXECUTED"),
            Self::SendMessage => write!(f, "SEND_MESSAGE"),
        }
    }
}

/// Metadata attached to every event. `emitted_at` is stamped by the bus at
/// publish time, never by the producer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    pub group_id: Option<String>,
    pub member_id: Option<String>,
    pub emitted_at: Option<DateTime<Utc>>,
}

/// Opaque handle to a raw transport message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHandle {
    pub id: String,
    pub chat_id: String,
    pub author_id: Option<String>,
    pub body: String,
}

/// Opaque handle to the chat a message arrived in, resolved by the transport
/// adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHandle {
    pub id: String,
    pub name: String,
    pub description: String,
    /// External ids of the current participants, as the transport saw them.
    #[serde(default)]
    pub participant_ids: Vec<String>,
}

/// Inbound: a member of a group sent a message.
#[derive(Debug, Clone)]
pub struct MemberMessageSent {
    pub group_id: String,
    pub member_id: String,
    pub display_name: String,
    pub is_admin: bool,
    pub target_member_id: Option<String>,
    pub target_display_name: Option<String>,
    pub target_author_id: Option<String>,
    pub chat: ChatHandle,
    pub message: MessageHandle,
}

/// A punished member interacted and the punishment was still active.
#[derive(Debug, Clone)]
pub struct PunishmentChecked {
    pub group_id: String,
    pub member_id: String,
    pub display_name: String,
    pub punishment: Punishment,
    /// `None` for permanent punishments.
    pub remaining_ms: Option<i64>,
    pub message: MessageHandle,
}

/// A validated command from an unpunished member, ready for its handler.
#[derive(Debug, Clone)]
pub struct CommandExecuted {
    pub command: String,
    pub message: MessageHandle,
    pub chat: ChatHandle,
    pub target_member_id: Option<String>,
    pub target_display_name: Option<String>,
    pub target_author_id: Option<String>,
}

/// Outbound: text for the delivery collaborator to transmit. The collaborator
/// owns deduplication of rapid identical repeats.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub chat_id: String,
    pub text: String,
    pub reply_to: Option<MessageHandle>,
    pub mention_ids: Vec<String>,
    pub edit_existing: bool,
}

impl SendMessage {
    #[must_use]
    pub fn text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            reply_to: None,
            mention_ids: Vec::new(),
            edit_existing: false,
        }
    }

    #[must_use]
    pub fn reply(message: &MessageHandle, text: impl Into<String>) -> Self {
        Self {
            chat_id: message.chat_id.clone(),
            text: text.into(),
            reply_to: Some(message.clone()),
            mention_ids: Vec::new(),
            edit_existing: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EventPayload {
    MemberMessageSent(MemberMessageSent),
    PunishmentChecked(PunishmentChecked),
    CommandExecuted(CommandExecuted),
    SendMessage(SendMessage),
}

impl EventPayload {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MemberMessageSent(_) => EventKind::MemberMessageSent,
            Self::PunishmentChecked(_) => EventKind::PunishmentChecked,
            Self::CommandExecuted(_) => EventKind::CommandExecuted,
            Self::SendMessage(_) => EventKind::SendMessage,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub payload: EventPayload,
    pub metadata: EventMetadata,
}

impl DomainEvent {
    /// Wrap a payload, deriving routing metadata from it. The timestamp is
    /// left empty for the bus to stamp.
    #[must_use]
    pub fn new(payload: EventPayload) -> Self {
        let (group_id, member_id) = match &payload {
            EventPayload::MemberMessageSent(p) => {
                (Some(p.group_id.clone()), Some(p.member_id.clone()))
            }
            EventPayload::PunishmentChecked(p) => {
                (Some(p.group_id.clone()), Some(p.member_id.clone()))
            }
            EventPayload::CommandExecuted(p) => (Some(p.chat.id.clone()), None),
            EventPayload::SendMessage(_) => (None, None),
        };
        Self {
            payload,
            metadata: EventMetadata {
                group_id,
                member_id,
                emitted_at: None,
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

impl From<MemberMessageSent> for DomainEvent {
    fn from(payload: MemberMessageSent) -> Self {
        Self::new(EventPayload::MemberMessageSent(payload))
    }
}

impl From<PunishmentChecked> for DomainEvent {
    fn from(payload: PunishmentChecked) -> Self {
        Self::new(EventPayload::PunishmentChecked(payload))
    }
}

impl From<CommandExecuted> for DomainEvent {
    fn from(payload: CommandExecuted) -> Self {
        Self::new(EventPayload::CommandExecuted(payload))
    }
}

impl From<SendMessage> for DomainEvent {
    fn from(payload: SendMessage) -> Self {
        Self::new(EventPayload::SendMessage(payload))
    }
}
