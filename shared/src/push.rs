//! Socket.IO v4 framing for the push channel.
//!
//! The backend pushes `object:created` and `object:deleted` through
//! Socket.IO. Over the websocket transport every websocket text frame carries
//! exactly one Engine.IO packet; Engine.IO `message` packets in turn carry one
//! Socket.IO packet, e.g. `42["object:deleted",{"id":"7"}]`.

use crate::record::{id_from_string_or_number, Record};
use serde::Deserialize;
use serde_json::Value;
use std::convert::TryFrom;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_RECONNECT_ATTEMPTS: usize = 5;

/// Joins the default namespace once the Engine.IO handshake is done.
pub const JOIN_FRAME: &str = "40";
pub const PONG_FRAME: &str = "3";

pub const CREATED_EVENT: &str = "object:created";
pub const DELETED_EVENT: &str = "object:deleted";

const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Error, PartialEq)]
pub enum PushError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownFrame(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownPacket(char),
    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },
    #[error("server refused the connection: {0}")]
    Refused(String),
    #[error("cannot derive a websocket url from {0:?}")]
    InvalidUrl(String),
}

fn malformed(what: &'static str, err: impl ToString) -> PushError {
    PushError::Malformed {
        what,
        reason: err.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// How long the server may stay silent before the connection counts as
    /// dead: one ping interval plus the ping timeout.
    pub fn silence_limit_ms(&self) -> u32 {
        u32::try_from(self.ping_interval.saturating_add(self.ping_timeout)).unwrap_or(u32::MAX)
    }
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(Packet),
    Upgrade,
    Noop,
}

/// Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Connect {
        namespace: String,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack: u64,
    },
    ConnectError {
        namespace: String,
        message: String,
    },
    /// Binary events and acks; their attachments never cross this channel.
    Binary,
}

impl FromStr for Frame {
    type Err = PushError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PushError::Empty)?;
        let body = chars.as_str();

        match kind {
            '0' => serde_json::from_str(body)
                .map(Frame::Open)
                .map_err(|e| malformed("handshake", e)),
            '1' => Ok(Frame::Close),
            '2' => Ok(Frame::Ping),
            '3' => Ok(Frame::Pong),
            '4' => body.parse().map(Frame::Message),
            '5' => Ok(Frame::Upgrade),
            '6' => Ok(Frame::Noop),
            other => Err(PushError::UnknownFrame(other)),
        }
    }
}

impl FromStr for Packet {
    type Err = PushError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PushError::Empty)?;
        let (namespace, rest) = split_namespace(chars.as_str());
        let (ack, data) = split_ack(rest);
        let namespace = namespace.to_string();

        match kind {
            '0' => Ok(Packet::Connect { namespace }),
            '1' => Ok(Packet::Disconnect { namespace }),
            '2' => {
                let mut args: Vec<Value> =
                    serde_json::from_str(data).map_err(|e| malformed("event", e))?;
                if args.is_empty() {
                    return Err(malformed("event", "missing event name"));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => return Err(malformed("event", format!("bad name {}", other))),
                };
                Ok(Packet::Event {
                    namespace,
                    ack,
                    name,
                    args,
                })
            }
            '3' => {
                let ack = ack.ok_or_else(|| malformed("ack", "missing ack id"))?;
                Ok(Packet::Ack { namespace, ack })
            }
            '4' => Ok(Packet::ConnectError {
                namespace,
                message: connect_error_message(data),
            }),
            '5' | '6' => Ok(Packet::Binary),
            other => Err(PushError::UnknownPacket(other)),
        }
    }
}

fn split_namespace(body: &str) -> (&str, &str) {
    if !body.starts_with('/') {
        return (DEFAULT_NAMESPACE, body);
    }
    match body.find(',') {
        Some(comma) => (&body[..comma], &body[comma + 1..]),
        None => (body, ""),
    }
}

fn split_ack(body: &str) -> (Option<u64>, &str) {
    let digits = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| body.len());
    (body[..digits].parse().ok(), &body[digits..])
}

fn connect_error_message(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
        Ok(Value::String(message)) => message,
        _ => data.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Created(Record),
    Deleted { id: String },
}

#[derive(Deserialize)]
struct DeletedPayload {
    #[serde(deserialize_with = "id_from_string_or_number")]
    id: String,
}

impl PushEvent {
    /// Decodes a catalog event; `Ok(None)` for events the catalog ignores.
    pub fn from_event(name: &str, args: &[Value]) -> Result<Option<Self>, PushError> {
        let payload = || {
            args.first()
                .cloned()
                .ok_or_else(|| malformed("payload", format!("{} without payload", name)))
        };

        match name {
            CREATED_EVENT => serde_json::from_value(payload()?)
                .map(|record| Some(PushEvent::Created(record)))
                .map_err(|e| malformed("payload", e)),
            DELETED_EVENT => serde_json::from_value::<DeletedPayload>(payload()?)
                .map(|deleted| Some(PushEvent::Deleted { id: deleted.id }))
                .map_err(|e| malformed("payload", e)),
            _ => Ok(None),
        }
    }
}

/// What the channel does in response to one incoming text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Engine.IO is open; answer with [`JOIN_FRAME`].
    Handshake(Handshake),
    Reply(&'static str),
    Joined,
    Event(PushEvent),
    Closed,
    Ignore,
}

pub fn react(text: &str) -> Result<Reaction, PushError> {
    let reaction = match text.parse::<Frame>()? {
        Frame::Open(handshake) => Reaction::Handshake(handshake),
        Frame::Ping => Reaction::Reply(PONG_FRAME),
        Frame::Close => Reaction::Closed,
        Frame::Message(packet) => match packet {
            Packet::Connect { ref namespace } if namespace == DEFAULT_NAMESPACE => {
                Reaction::Joined
            }
            Packet::Disconnect { ref namespace } if namespace == DEFAULT_NAMESPACE => {
                Reaction::Closed
            }
            Packet::Event {
                namespace,
                name,
                args,
                ..
            } if namespace == DEFAULT_NAMESPACE => PushEvent::from_event(&name, &args)?
                .map(Reaction::Event)
                .unwrap_or(Reaction::Ignore),
            Packet::ConnectError { message, .. } => return Err(PushError::Refused(message)),
            _ => Reaction::Ignore,
        },
        Frame::Pong | Frame::Upgrade | Frame::Noop => Reaction::Ignore,
    };
    Ok(reaction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Attempt(usize),
    GiveUp,
}

/// Reconnect bookkeeping of one push channel.
///
/// Every transport loss counts against [`MAX_RECONNECT_ATTEMPTS`]; joining
/// the namespace resets the count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    attempts: usize,
    joined: bool,
    exhausted: bool,
}

impl ConnectionState {
    pub fn is_live(&self) -> bool {
        self.joined
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn joined(&mut self) {
        self.joined = true;
        self.attempts = 0;
        self.exhausted = false;
    }

    /// The transport closed, for whatever reason. Returns `true` if a
    /// reconnect should be scheduled.
    pub fn dropped(&mut self) -> bool {
        self.joined = false;
        !self.exhausted
    }

    pub fn next_attempt(&mut self) -> Retry {
        if self.exhausted || self.attempts >= MAX_RECONNECT_ATTEMPTS {
            self.exhausted = true;
            return Retry::GiveUp;
        }
        self.attempts += 1;
        Retry::Attempt(self.attempts)
    }
}

/// `http(s)://host[/]` to `ws(s)://host/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(api_url: &str) -> Result<String, PushError> {
    let trimmed = api_url.trim().trim_end_matches('/');
    let origin = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(PushError::InvalidUrl(api_url.to_string()));
    };
    if origin.ends_with("://") {
        return Err(PushError::InvalidUrl(api_url.to_string()));
    }
    Ok(format!("{}/socket.io/?EIO=4&transport=websocket", origin))
}
