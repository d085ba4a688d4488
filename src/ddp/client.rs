// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DDP Transport Client
 * One logical DDP connection driven by a single receive task
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, info_span, trace, warn, Instrument, Span};
use url::Url;

use super::auth::Credentials;
use super::codec::{self, Frame};
use super::collections::CollectionSnapshot;
use super::endpoint::{self, ProxyAddr};
use super::message::Message;
use super::session::{Action, ClientEvent, ConnectionState, IdAllocator, Session, SessionOptions};
use crate::errors::{DdpError, DdpResult};
use crate::str_utils::preview;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// App URL (`https://…`) or explicit websocket URL (`wss://…`)
    pub endpoint: String,
    pub credentials: Option<Credentials>,
    /// Upstream HTTP proxy, `host:port`
    pub proxy: Option<String>,
    pub auto_connect: bool,
    pub auto_pong: bool,
    pub track_collections: bool,
    /// Bound on socket open and on waiting for `Ready`
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials: None,
            proxy: None,
            auto_connect: true,
            auto_pong: true,
            track_collections: true,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            auto_connect: self.auto_connect,
            auto_pong: self.auto_pong,
            track_collections: self.track_collections,
            credentials: self.credentials.clone(),
        }
    }
}

enum Outbound {
    Message(Message),
    Close,
}

/// A live socket and the task that owns it
struct Link {
    outbound: mpsc::UnboundedSender<Outbound>,
    session: Arc<Mutex<Session>>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

struct Shared {
    config: ClientConfig,
    ids: IdAllocator,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ClientEvent>>>>,
    /// Bumped whenever a link is retired; only the current link publishes
    generation: Arc<AtomicU64>,
    link: Mutex<Option<Link>>,
    span: Span,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            let _ = link.outbound.send(Outbound::Close);
        }
    }
}

/// Async DDP client. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct DdpClient {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for DdpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdpClient")
            .field("endpoint", &self.shared.config.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

impl DdpClient {
    pub fn new(config: ClientConfig) -> Self {
        let conn = CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        let span = info_span!("ddp_client", conn, endpoint = %config.endpoint);
        Self {
            shared: Arc::new(Shared {
                config,
                ids: IdAllocator::default(),
                subscribers: Arc::new(Mutex::new(Vec::new())),
                generation: Arc::new(AtomicU64::new(0)),
                link: Mutex::new(None),
                span,
            }),
        }
    }

    /// Open, start and wait for `Ready` in one step
    pub async fn connect(config: ClientConfig) -> DdpResult<Self> {
        let client = Self::new(config);
        client.start().await?;
        if let Err(e) = client.wait_ready().await {
            client.close();
            return Err(e);
        }
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.config.endpoint
    }

    /// Fresh correlation id, unique for the life of this client
    pub fn allocate_id(&self) -> String {
        self.shared.ids.next_id()
    }

    pub fn state(&self) -> ConnectionState {
        match self.shared.link.lock().as_ref() {
            Some(link) => link.session.lock().state(),
            None => ConnectionState::Idle,
        }
    }

    pub fn session_token(&self) -> Option<String> {
        let link = self.shared.link.lock();
        let session = link.as_ref()?.session.lock();
        session.session_token().map(str::to_string)
    }

    /// Snapshot of the synchronized collections of the current connection
    pub fn collections(&self) -> CollectionSnapshot {
        match self.shared.link.lock().as_ref() {
            Some(link) => link.session.lock().collections().clone(),
            None => CollectionSnapshot::new(),
        }
    }

    /// Receive every lifecycle and traffic event from now on.
    /// Subscriptions survive reconnects.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ClientEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.subscribers.lock().push(tx);
        rx
    }

    /// Open the socket. The handshake (and login) continue on the
    /// connection task; use [`DdpClient::wait_ready`] to await them.
    pub async fn start(&self) -> DdpResult<()> {
        if self.shared.link.lock().is_some() {
            return Err(DdpError::AlreadyStarted);
        }

        let config = &self.shared.config;
        let url = endpoint::resolve_ws_url(&config.endpoint)?;
        if let Some(credentials) = &config.credentials {
            debug!(parent: &self.shared.span, "[DDP] Will log in as {}", credentials.principal());
        }
        let session = Arc::new(Mutex::new(Session::new(config.session_options())));

        let opened = tokio::time::timeout(config.connect_timeout, open_socket(&url, config.proxy.as_deref()))
            .instrument(self.shared.span.clone())
            .await;
        let ws = match opened {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                self.fail_before_open(&session, &e);
                return Err(e);
            }
            Err(_) => {
                let e = DdpError::Timeout {
                    duration: config.connect_timeout,
                };
                self.fail_before_open(&session, &e);
                return Err(e);
            }
        };

        let mut link = self.shared.link.lock();
        if link.is_some() {
            return Err(DdpError::AlreadyStarted);
        }

        // Any previous socket stops publishing from here on
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (outbound, commands) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let task = Connection {
            endpoint: url.to_string(),
            session: Arc::clone(&session),
            state: state_tx,
            ids: self.shared.ids.clone(),
            subscribers: Arc::clone(&self.shared.subscribers),
            generation,
            current_generation: Arc::clone(&self.shared.generation),
        };
        let task = tokio::spawn(task.run(ws, commands).instrument(self.shared.span.clone()));
        *link = Some(Link {
            outbound,
            session,
            state: state_rx,
            task,
        });
        Ok(())
    }

    /// Resolve once the connection is `Ready`. Login rejection and
    /// connection failure are reported as distinct errors.
    pub async fn wait_ready(&self) -> DdpResult<()> {
        let (mut state, session) = {
            let link = self.shared.link.lock();
            let link = link.as_ref().ok_or(DdpError::NotConnected)?;
            (link.state.clone(), Arc::clone(&link.session))
        };
        let timeout = self.shared.config.connect_timeout;
        let endpoint = self.shared.config.endpoint.clone();

        let wait = async move {
            loop {
                let current = *state.borrow_and_update();
                match current {
                    ConnectionState::Ready => return Ok(()),
                    ConnectionState::LoginRejected => {
                        let reason = session
                            .lock()
                            .rejection_reason()
                            .unwrap_or("login rejected")
                            .to_string();
                        return Err(DdpError::LoginRejected { reason });
                    }
                    ConnectionState::Failed | ConnectionState::Closed => {
                        return Err(DdpError::transport(
                            endpoint,
                            format!("connection ended in state {:?} before ready", current),
                        ));
                    }
                    _ => {}
                }
                if state.changed().await.is_err() {
                    return Err(DdpError::transport(endpoint, "connection task ended"));
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(DdpError::Timeout { duration: timeout }),
        }
    }

    /// Transmit a message as-is. Ids are never assigned here.
    pub fn send(&self, message: Message) -> DdpResult<()> {
        let link = self.shared.link.lock();
        let link = link.as_ref().ok_or(DdpError::NotConnected)?;
        if !link.session.lock().state().can_send() {
            return Err(DdpError::NotConnected);
        }
        link.outbound
            .send(Outbound::Message(message))
            .map_err(|_| DdpError::NotConnected)
    }

    /// Close the socket. In-flight replies are abandoned.
    pub fn close(&self) {
        if let Some(link) = self.shared.link.lock().take() {
            if link.outbound.send(Outbound::Close).is_err() {
                link.task.abort();
            }
        }
    }

    /// Tear down and open a fresh connection with an empty snapshot.
    /// Events of the old socket, including its close, are no longer
    /// delivered to subscribers.
    pub async fn reconnect(&self) -> DdpResult<()> {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.close();
        info!(parent: &self.shared.span, "[DDP] Reconnecting");
        self.start().await
    }

    fn fail_before_open(&self, session: &Arc<Mutex<Session>>, err: &DdpError) {
        let actions = session.lock().on_transport_error(err.to_string());
        let _enter = self.shared.span.enter();
        for action in actions {
            if let Action::Emit(event) = action {
                publish(&self.shared.subscribers, event);
            }
        }
    }
}

async fn open_socket(url: &Url, proxy: Option<&str>) -> DdpResult<WsStream> {
    debug!("[DDP] Opening {}", url);
    let endpoint = url.to_string();
    match proxy {
        None => {
            let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| DdpError::transport(&endpoint, e))?;
            Ok(ws)
        }
        Some(proxy) => {
            let proxy = ProxyAddr::parse(proxy)?;
            let stream = endpoint::open_tunnel(&proxy, url).await?;
            let (ws, _) =
                tokio_tungstenite::client_async_tls_with_config(url.as_str(), stream, None, None)
                    .await
                    .map_err(|e| DdpError::transport(&endpoint, e))?;
            Ok(ws)
        }
    }
}

/// Log the event at its lifecycle level and fan it out to subscribers
fn publish(subscribers: &Mutex<Vec<mpsc::UnboundedSender<ClientEvent>>>, event: ClientEvent) {
    match &event {
        ClientEvent::Open => debug!("[DDP] Socket open"),
        ClientEvent::Ready => info!("[DDP] Ready"),
        ClientEvent::LoginSucceeded { .. } => info!("[DDP] Login succeeded"),
        ClientEvent::LoginFailed(reply) => warn!(
            "[DDP] Login failed: {}",
            reply.error_reason().unwrap_or("no session token")
        ),
        ClientEvent::Sent(message) => trace!("[DDP] >> {}", preview_message(message)),
        ClientEvent::Message(message) => trace!("[DDP] << {}", preview_message(message)),
        ClientEvent::Error(reason) => error!("[DDP] {}", reason),
        ClientEvent::Closed { reason } => warn!("[DDP] Closed: {}", reason),
    }
    subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
}

fn preview_message(message: &Message) -> String {
    match serde_json::to_string(message) {
        Ok(json) => preview(&json, 200).to_string(),
        Err(_) => format!("<{}>", message.kind().as_str()),
    }
}

/// State owned by the connection task
struct Connection {
    endpoint: String,
    session: Arc<Mutex<Session>>,
    state: watch::Sender<ConnectionState>,
    ids: IdAllocator,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ClientEvent>>>>,
    generation: u64,
    current_generation: Arc<AtomicU64>,
}

impl Connection {
    async fn run(self, ws: WsStream, mut commands: mpsc::UnboundedReceiver<Outbound>) {
        let (mut sink, mut stream) = ws.split();

        let actions = self.session.lock().on_open();
        if !self.perform(&mut sink, actions).await {
            return;
        }

        loop {
            tokio::select! {
                frame = stream.next() => {
                    let keep_going = match frame {
                        Some(Ok(WsMessage::Text(text))) => self.on_text(&mut sink, &text).await,
                        Some(Ok(WsMessage::Close(frame))) => {
                            let reason = frame
                                .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                                .unwrap_or_else(|| "closed by server".to_string());
                            let actions = self.session.lock().on_close(reason);
                            self.perform(&mut sink, actions).await;
                            false
                        }
                        Some(Ok(_)) => true,
                        Some(Err(e)) => {
                            let actions = self.session.lock().on_transport_error(e.to_string());
                            self.perform(&mut sink, actions).await;
                            false
                        }
                        None => {
                            let actions = self.session.lock().on_close("stream ended");
                            self.perform(&mut sink, actions).await;
                            false
                        }
                    };
                    if !keep_going {
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(Outbound::Message(message)) => {
                        if !self.write(&mut sink, message).await {
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        let actions = self.session.lock().on_close("closed by client");
                        self.perform(&mut sink, actions).await;
                        break;
                    }
                },
            }
        }

        debug!("[DDP] Connection task finished in state {:?}", self.session.lock().state());
    }

    async fn on_text(&self, sink: &mut WsSink, text: &str) -> bool {
        let frame = match codec::decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[DDP] Undecodable frame ({}): {}", e, preview(text, 120));
                return true;
            }
        };

        match frame {
            Frame::Open => trace!("[DDP] SockJS open"),
            Frame::Heartbeat => trace!("[DDP] SockJS heartbeat"),
            Frame::Close { code, reason } => {
                let actions = self.session.lock().on_close(format!("{} {}", code, reason));
                self.perform(sink, actions).await;
                return false;
            }
            Frame::Messages(messages) => {
                for message in messages {
                    let message = match message {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("[DDP] Skipping undecodable message: {}", e);
                            continue;
                        }
                    };
                    let actions = self.session.lock().on_message(message, &self.ids);
                    if !self.perform(sink, actions).await {
                        return false;
                    }
                }
            }
        }

        // A refused protocol version leaves nothing to talk about
        self.session.lock().state() != ConnectionState::Failed
    }

    /// Run session actions in order. Returns false once the socket is unusable.
    async fn perform(&self, sink: &mut WsSink, actions: Vec<Action>) -> bool {
        for action in actions {
            match action {
                Action::Send(message) => {
                    if !self.write(sink, message).await {
                        return false;
                    }
                }
                Action::Emit(event) => {
                    self.sync_state();
                    self.emit(event);
                }
            }
        }
        self.sync_state();
        true
    }

    async fn write(&self, sink: &mut WsSink, message: Message) -> bool {
        let text = match codec::encode(&message) {
            Ok(text) => text,
            Err(e) => {
                warn!("[DDP] Dropping unencodable message: {}", e);
                return true;
            }
        };

        if let Err(e) = sink.send(WsMessage::Text(text)).await {
            let reason = DdpError::transport(&self.endpoint, e).to_string();
            let actions = self.session.lock().on_transport_error(reason);
            for action in actions {
                if let Action::Emit(event) = action {
                    self.sync_state();
                    self.emit(event);
                }
            }
            self.sync_state();
            return false;
        }

        self.session.lock().on_sent(&message);
        self.sync_state();
        self.emit(ClientEvent::Sent(message));
        true
    }

    /// Publish unless this connection has been replaced
    fn emit(&self, event: ClientEvent) {
        if self.current_generation.load(Ordering::SeqCst) == self.generation {
            publish(&self.subscribers, event);
        } else {
            debug!("[DDP] Retired connection event dropped: {:?}", event);
        }
    }

    fn sync_state(&self) {
        let state = self.session.lock().state();
        self.state.send_if_modified(|current| {
            if *current != state {
                *current = state;
                true
            } else {
                false
            }
        });
    }
}
