// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DDP Session State Machine
 * Socket-free handshake, login, ping and collection bookkeeping
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::auth::{login_message, Credentials};
use super::collections::CollectionSnapshot;
use super::message::Message;

/// Lifecycle of one connection.
///
/// `Idle → SocketOpen → ConnectSent → Connected → (LoginSent →) Ready`.
/// A login result carrying a session token moves `LoginSent` straight to
/// `Ready`. `Failed`, `Closed` and `LoginRejected` never lead back to
/// `Ready`; only a reconnect (a fresh session) does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    SocketOpen,
    ConnectSent,
    Connected,
    LoginSent,
    Ready,
    LoginRejected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Whether outbound messages may be written in this state
    pub fn can_send(&self) -> bool {
        !matches!(
            self,
            ConnectionState::Idle | ConnectionState::Failed | ConnectionState::Closed
        )
    }

    /// States from which `Ready` can no longer be reached
    pub fn is_dead_end(&self) -> bool {
        matches!(
            self,
            ConnectionState::LoginRejected | ConnectionState::Failed | ConnectionState::Closed
        )
    }
}

/// Observable lifecycle and traffic events of a connection
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Open,
    Sent(Message),
    /// Generic "message received" observation, delivered for every inbound message
    Message(Message),
    Ready,
    LoginSucceeded { token: String },
    LoginFailed(Message),
    Error(String),
    Closed { reason: String },
}

/// What the connection task must do after feeding the session
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send(Message),
    Emit(ClientEvent),
}

/// Monotonic correlation ids, unique per client for the life of the process
#[derive(Debug, Clone, Default)]
pub struct IdAllocator(Arc<AtomicU64>);

impl IdAllocator {
    pub fn next_id(&self) -> String {
        (self.0.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub auto_connect: bool,
    pub auto_pong: bool,
    pub track_collections: bool,
    pub credentials: Option<Credentials>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            auto_connect: true,
            auto_pong: true,
            track_collections: true,
            credentials: None,
        }
    }
}

pub struct Session {
    options: SessionOptions,
    state: ConnectionState,
    login_id: Option<String>,
    token: Option<String>,
    server_session: Option<String>,
    rejection: Option<String>,
    collections: CollectionSnapshot,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            state: ConnectionState::Idle,
            login_id: None,
            token: None,
            server_session: None,
            rejection: None,
            collections: CollectionSnapshot::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn server_session(&self) -> Option<&str> {
        self.server_session.as_deref()
    }

    /// Why the last login attempt was refused, if it was
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection.as_deref()
    }

    pub fn collections(&self) -> &CollectionSnapshot {
        &self.collections
    }

    /// Back to `Idle` with an empty snapshot, for a reconnect
    pub fn reset(&mut self) {
        self.state = ConnectionState::Idle;
        self.login_id = None;
        self.token = None;
        self.server_session = None;
        self.rejection = None;
        self.collections.clear();
    }

    pub fn on_open(&mut self) -> Vec<Action> {
        self.state = ConnectionState::SocketOpen;
        let mut actions = vec![Action::Emit(ClientEvent::Open)];
        if self.options.auto_connect {
            actions.push(Action::Send(Message::connect()));
            self.state = ConnectionState::ConnectSent;
        }
        actions
    }

    /// Record an outbound message written by the caller (a manual handshake)
    pub fn on_sent(&mut self, message: &Message) {
        if matches!(message, Message::Connect { .. }) && self.state == ConnectionState::SocketOpen {
            self.state = ConnectionState::ConnectSent;
        }
    }

    pub fn on_message(&mut self, message: Message, ids: &IdAllocator) -> Vec<Action> {
        let mut actions = Vec::new();

        if self.options.track_collections {
            self.collections.apply(&message);
        }

        match &message {
            Message::Connected { session } => {
                self.state = ConnectionState::Connected;
                self.server_session = Some(session.clone());
                match &self.options.credentials {
                    Some(credentials) => {
                        let mut login = login_message(credentials);
                        let id = ids.next_id();
                        login.set_request_id(id.clone());
                        self.login_id = Some(id);
                        self.state = ConnectionState::LoginSent;
                        actions.push(Action::Send(login));
                    }
                    None => {
                        self.state = ConnectionState::Ready;
                        actions.push(Action::Emit(ClientEvent::Ready));
                    }
                }
            }
            Message::Failed { version } => {
                self.state = ConnectionState::Failed;
                actions.push(Action::Emit(ClientEvent::Error(format!(
                    "server refused protocol negotiation (suggested version {})",
                    version.as_deref().unwrap_or("none")
                ))));
            }
            Message::Ping { id } if self.options.auto_pong => {
                actions.push(Action::Send(Message::pong(id.clone())));
            }
            Message::Result { id, .. } if self.login_id.as_deref() == Some(id.as_str()) => {
                self.login_id = None;
                match message.session_token() {
                    Some(token) => {
                        self.token = Some(token.to_string());
                        self.state = ConnectionState::Ready;
                        actions.push(Action::Emit(ClientEvent::Ready));
                        actions.push(Action::Emit(ClientEvent::LoginSucceeded {
                            token: token.to_string(),
                        }));
                    }
                    None => {
                        self.state = ConnectionState::LoginRejected;
                        self.rejection = Some(
                            message
                                .error_reason()
                                .unwrap_or("login reply carried no session token")
                                .to_string(),
                        );
                        actions.push(Action::Emit(ClientEvent::LoginFailed(message.clone())));
                    }
                }
            }
            _ => {}
        }

        actions.insert(0, Action::Emit(ClientEvent::Message(message)));
        actions
    }

    pub fn on_transport_error(&mut self, reason: impl Into<String>) -> Vec<Action> {
        self.state = ConnectionState::Failed;
        vec![Action::Emit(ClientEvent::Error(reason.into()))]
    }

    pub fn on_close(&mut self, reason: impl Into<String>) -> Vec<Action> {
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Closed;
        }
        vec![Action::Emit(ClientEvent::Closed {
            reason: reason.into(),
        })]
    }
}
