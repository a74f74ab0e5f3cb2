use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Color class of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageClass {
    /// Plain unclassified text
    Normal,

    /// Informational server output
    Info,

    /// Warning or error output
    Error,

    /// In-game chat line
    Chat,

    /// "[PLAYER_COMMAND]" echo
    PlayerCommand,

    /// "issued server command" echo
    ServerCommand,
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageClass::Normal => write!(f, "normal"),
            MessageClass::Info => write!(f, "info"),
            MessageClass::Error => write!(f, "error"),
            MessageClass::Chat => write!(f, "chat"),
            MessageClass::PlayerCommand => write!(f, "player-command"),
            MessageClass::ServerCommand => write!(f, "server-command"),
        }
    }
}

/// A classified console line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Unique ID for this message
    pub id: Uuid,

    /// Color class
    pub class: MessageClass,

    /// Timestamp when the message was received
    pub timestamp: DateTime<Utc>,

    /// The decoded line, without its terminator
    pub text: String,
}

impl ConsoleMessage {
    /// Create a new message with the given class and text
    pub fn new(class: MessageClass, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            class,
            timestamp: Utc::now(),
            text: text.into(),
        }
    }

    /// Create a plain informational message
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageClass::Info, text)
    }

    /// Create an error message
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageClass::Error, text)
    }
}

/// A currently-connected player as reported by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Player name, the identity key while connected
    pub name: String,

    /// Player UUID as reported by the server
    #[serde(default)]
    pub uuid: String,

    /// Remote address the player connected from
    #[serde(default)]
    pub ip: String,

    /// When this client first saw the player
    #[serde(default = "Utc::now")]
    pub join_time: DateTime<Utc>,

    /// Any extra fields the server dialect reports
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PlayerInfo {
    /// Create a player record from a join notification
    pub fn joined(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: String::new(),
            ip: ip.into(),
            join_time: Utc::now(),
            extra: BTreeMap::new(),
        }
    }
}

/// Effect of a classified line on the player list
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A player joined the server
    Joined(PlayerInfo),

    /// A player left the server
    Left { name: String },

    /// Full replacement of the player list
    Snapshot(Vec<PlayerInfo>),

    /// A chat line; does not affect the player list
    Chat { name: String, message: String },

    /// No effect on the player list
    Other,
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Notification published from the session core to the presentation layer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A classified console line arrived
    Console(ConsoleMessage),

    /// The player list changed; carries a full snapshot
    PlayerList(Vec<PlayerInfo>),

    /// The connection state changed
    State(ConnectionState),
}
