//! Live connection to the backend's Socket.IO endpoint.
//!
//! A `PushChannel` belongs to the list view that opened it. Dropping it
//! closes the socket and cancels any pending reconnection, so a remounted
//! list never shares a connection with the one it replaced.

use seed::{prelude::*, *};
use shared::push::{self, ConnectionState, PushEvent, Reaction, Retry, JOIN_FRAME};
use web_sys::CloseEvent;

const NORMAL_CLOSURE: u16 = 1000;

pub enum Msg {
    Opened,
    Frame(WebSocketMessage),
    Closed(CloseEvent),
    Failed,
    Silent,
    Reconnect(usize),
}

pub struct PushChannel {
    url: String,
    socket: Option<WebSocket>,
    reconnector: Option<StreamHandle>,
    watchdog: Option<CmdHandle>,
    silence_limit_ms: Option<u32>,
    state: ConnectionState,
}

impl PushChannel {
    pub fn open(api_url: &str, orders: &mut impl Orders<Msg>) -> Option<Self> {
        let url = match push::socket_url(api_url) {
            Ok(url) => url,
            Err(err) => {
                error!("Push channel disabled:", err.to_string());
                return None;
            }
        };

        let mut channel = PushChannel {
            url,
            socket: None,
            reconnector: None,
            watchdog: None,
            silence_limit_ms: None,
            state: ConnectionState::default(),
        };
        channel.connect(orders);
        Some(channel)
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    fn connect(&mut self, orders: &mut impl Orders<Msg>) {
        log!("Connecting push channel to", self.url);
        let socket = WebSocket::builder(&self.url, orders)
            .on_open(|| Msg::Opened)
            .on_message(Msg::Frame)
            .on_close(Msg::Closed)
            .on_error(|| Msg::Failed)
            .build_and_open();

        match socket {
            Ok(socket) => self.socket = Some(socket),
            Err(err) => {
                error!("Push channel could not open:", err);
                self.lost(orders);
            }
        }
    }

    // closing our own socket raises no `Closed`, its callbacks go with it
    fn close_socket(&mut self, reason: &str) {
        self.watchdog = None;
        self.silence_limit_ms = None;
        if let Some(socket) = self.socket.take() {
            let _ = socket.close(Some(NORMAL_CLOSURE), Some(reason));
        }
    }

    /// The transport is gone; retry unless the attempts are used up.
    fn lost(&mut self, orders: &mut impl Orders<Msg>) {
        if self.state.dropped() && self.reconnector.is_none() {
            self.reconnector = Some(orders.stream_with_handle(streams::backoff(None, Msg::Reconnect)));
        }
    }

    fn arm_watchdog(&mut self, orders: &mut impl Orders<Msg>) {
        if let Some(limit) = self.silence_limit_ms {
            self.watchdog = Some(orders.perform_cmd_with_handle(cmds::timeout(limit, || Msg::Silent)));
        }
    }

    fn send(&self, frame: &str) {
        if let Some(socket) = &self.socket {
            if let Err(err) = socket.send_text(frame) {
                error!("Push channel send failed:", err);
            }
        }
    }

    fn handle_frame(&mut self, text: &str, orders: &mut impl Orders<Msg>) -> Option<PushEvent> {
        let reaction = push::react(text);
        if let Ok(Reaction::Handshake(handshake)) = &reaction {
            self.silence_limit_ms = Some(handshake.silence_limit_ms());
            self.send(JOIN_FRAME);
        }
        self.arm_watchdog(orders);

        match reaction {
            Ok(Reaction::Handshake(_)) => None,
            Ok(Reaction::Reply(frame)) => {
                self.send(frame);
                None
            }
            Ok(Reaction::Joined) => {
                log!("Push channel connected");
                self.state.joined();
                self.reconnector = None;
                None
            }
            Ok(Reaction::Event(event)) => {
                log!("Push event received:", event);
                Some(event)
            }
            Ok(Reaction::Closed) => {
                log!("Push channel closed by server");
                self.close_socket("closed by server");
                self.lost(orders);
                None
            }
            Ok(Reaction::Ignore) => None,
            Err(err) => {
                error!("Skipping push frame:", err.to_string());
                None
            }
        }
    }
}

/// Returns the catalog event carried by `msg`, if any.
pub fn update(
    msg: Msg,
    channel: &mut PushChannel,
    orders: &mut impl Orders<Msg>,
) -> Option<PushEvent> {
    match msg {
        Msg::Opened => {
            log!("Push socket open, waiting for handshake");
            None
        }
        Msg::Frame(message) => match message.text() {
            Ok(text) => channel.handle_frame(&text, orders),
            Err(err) => {
                error!("Unreadable push frame:", err);
                None
            }
        },
        Msg::Closed(event) => {
            log!("Push channel disconnected, code", event.code());
            channel.watchdog = None;
            channel.silence_limit_ms = None;
            channel.socket = None;
            channel.lost(orders);
            None
        }
        Msg::Failed => {
            error!("Push channel error");
            None
        }
        Msg::Silent => {
            error!("Push channel silent past its ping timeout, reconnecting");
            channel.close_socket("ping timeout");
            channel.lost(orders);
            None
        }
        // a socket is still connecting; wait for its outcome
        Msg::Reconnect(_) if channel.socket.is_some() => None,
        Msg::Reconnect(_) => {
            match channel.state.next_attempt() {
                Retry::Attempt(attempt) => {
                    log!("Push channel reconnect attempt", attempt);
                    channel.connect(orders);
                }
                Retry::GiveUp => {
                    error!("Push channel gave up after", channel.state.attempts(), "attempts");
                    channel.reconnector = None;
                }
            }
            None
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.reconnector = None;
        self.close_socket("list view closed");
    }
}
