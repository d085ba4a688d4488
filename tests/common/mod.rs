// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! In-process DDP server for driving the real client over a websocket.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async, WebSocketStream};

use lonkero_ddp::ddp::codec;
use lonkero_ddp::ddp::{ClientConfig, Message};

pub struct FakeServer {
    pub url: String,
    pub connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.url.clone());
        config.connect_timeout = Duration::from_secs(5);
        config
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Accept websocket connections forever, running `handler` on each
pub async fn spawn<F, Fut>(handler: F) -> FakeServer
where
    F: Fn(ServerConn) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connections);
    let handler = Arc::new(handler);

    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let number = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Ok(ws) = accept_async(stream).await {
                    handler(ServerConn { ws, number }).await;
                }
            });
        }
    });

    FakeServer {
        url: format!("ws://{}/websocket", addr),
        connections,
        handle,
    }
}

pub struct ServerConn {
    ws: WebSocketStream<TcpStream>,
    /// 1-based accept order
    pub number: usize,
}

impl ServerConn {
    /// Next DDP message from the client; `None` once the socket closes
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.ws.next().await? {
                Ok(WsMessage::Text(text)) => return codec::decode(&text).ok(),
                Ok(WsMessage::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Send the way a SockJS endpoint does: `a["<json>"]`
    pub async fn send(&mut self, message: &Message) {
        let text = format!("a{}", codec::encode(message).unwrap());
        let _ = self.ws.send(WsMessage::Text(text)).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        let _ = self.ws.send(WsMessage::Text(text.to_string())).await;
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    /// SockJS open frame, the client's `connect`, then `connected`
    pub async fn handshake(&mut self) -> Option<Message> {
        self.send_raw("o").await;
        let connect = self.recv().await?;
        self.send(&msg(json!({"msg": "connected", "session": format!("s{}", self.number)})))
            .await;
        Some(connect)
    }

    /// Answer every method and sub with `respond`; pings are ignored
    pub async fn serve<R>(&mut self, respond: R)
    where
        R: Fn(&Message) -> Option<Value>,
    {
        while let Some(message) = self.recv().await {
            if let Some(reply) = respond(&message) {
                self.send(&msg(reply)).await;
            }
        }
    }
}

pub fn msg(value: Value) -> Message {
    serde_json::from_value(value).unwrap()
}

pub fn result(id: &str, value: Value) -> Value {
    json!({"msg": "result", "id": id, "result": value})
}

pub fn error_result(id: &str, code: Value, reason: &str) -> Value {
    json!({"msg": "result", "id": id, "error": {"error": code, "reason": reason}})
}
