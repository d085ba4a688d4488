// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DDP Endpoint Resolution
 * App URL to SockJS websocket URL, plus HTTP CONNECT proxy tunnels
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

use crate::errors::{DdpError, DdpResult};

const DIGITS: &[u8] = b"0123456789";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Largest proxy response header we are willing to buffer
const MAX_PROXY_HEADER: usize = 16 * 1024;

fn random_string(chars: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| chars[rng.random_range(0..chars.len())] as char)
        .collect()
}

/// `sockjs/<3 digits>/<8 letters>/websocket`, as the Meteor client generates it
pub fn sockjs_path() -> String {
    format!(
        "sockjs/{}/{}/websocket",
        random_string(DIGITS, 3),
        random_string(LETTERS, 8)
    )
}

/// Resolve an application URL (or an explicit websocket URL) to the websocket
/// endpoint. `ws://`/`wss://` URLs are used verbatim; `http(s)://` URLs get
/// their scheme swapped and a SockJS path appended. A bare host is assumed to
/// be HTTPS unless it names a common development port.
pub fn resolve_ws_url(target: &str) -> DdpResult<Url> {
    let target = target.trim();
    if target.starts_with("ws://") || target.starts_with("wss://") {
        return Url::parse(target).map_err(|e| DdpError::Endpoint {
            url: target.to_string(),
            reason: e.to_string(),
        });
    }

    let with_scheme = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else if is_dev_host(target) {
        format!("http://{}", target)
    } else {
        format!("https://{}", target)
    };

    let mut ws = if let Some(rest) = with_scheme.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = with_scheme.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        with_scheme
    };

    if !ws.ends_with('/') {
        ws.push('/');
    }
    ws.push_str(&sockjs_path());

    Url::parse(&ws).map_err(|e| DdpError::Endpoint {
        url: target.to_string(),
        reason: e.to_string(),
    })
}

fn is_dev_host(target: &str) -> bool {
    let host_part = target.split('/').next().unwrap_or_default();
    match host_part.rsplit_once(':') {
        Some((_, port)) => matches!(port, "80" | "3000" | "8000" | "8080" | "8888"),
        None => host_part == "localhost",
    }
}

/// An upstream HTTP proxy, `host:port` or `http://host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAddr {
    pub host: String,
    pub port: u16,
}

impl ProxyAddr {
    pub fn parse(spec: &str) -> DdpResult<Self> {
        let trimmed = spec
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| DdpError::Proxy {
            proxy: spec.to_string(),
            reason: "expected host:port".to_string(),
        })?;
        let port = port.parse::<u16>().map_err(|e| DdpError::Proxy {
            proxy: spec.to_string(),
            reason: format!("invalid port: {}", e),
        })?;
        if host.is_empty() {
            return Err(DdpError::Proxy {
                proxy: spec.to_string(),
                reason: "empty host".to_string(),
            });
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Open a TCP stream to the websocket host through an HTTP CONNECT tunnel.
pub async fn open_tunnel(proxy: &ProxyAddr, url: &Url) -> DdpResult<TcpStream> {
    let host = url.host_str().ok_or_else(|| DdpError::Endpoint {
        url: url.to_string(),
        reason: "missing host".to_string(),
    })?;
    let port = url.port_or_known_default().unwrap_or(80);
    let target = format!("{}:{}", host, port);

    let mut stream = TcpStream::connect(proxy.authority())
        .await
        .map_err(|e| DdpError::Proxy {
            proxy: proxy.authority(),
            reason: e.to_string(),
        })?;

    let request = format!(
        "CONNECT {target} HTTP/1.1\r\nHost: {target}\r\nProxy-Connection: keep-alive\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let mut header = Vec::with_capacity(512);
    let mut byte = [0u8; 1];
    while !header.ends_with(b"\r\n\r\n") {
        if header.len() >= MAX_PROXY_HEADER {
            return Err(DdpError::Proxy {
                proxy: proxy.authority(),
                reason: "oversized CONNECT response".to_string(),
            });
        }
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err(DdpError::Proxy {
                proxy: proxy.authority(),
                reason: "connection closed during CONNECT".to_string(),
            });
        }
        header.push(byte[0]);
    }

    let text = String::from_utf8_lossy(&header);
    let status_line = text.lines().next().unwrap_or_default();
    if status_line.split_whitespace().nth(1) != Some("200") {
        return Err(DdpError::Proxy {
            proxy: proxy.authority(),
            reason: format!("CONNECT refused: {}", status_line),
        });
    }

    debug!("[DDP] Tunnel to {} established via {}", target, proxy.authority());
    Ok(stream)
}
