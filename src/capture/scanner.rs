// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Capture Scanner
 * Bounded-memory recovery of DDP messages from traffic capture files
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, trace};

use crate::ddp::codec::{self, Frame};
use crate::ddp::{Message, MessageKind};
use crate::errors::{DdpError, DdpResult};

/// Bytes that open a wire-encoded DDP message: `["{\"msg`
pub const MESSAGE_MARKER: &[u8] = b"[\"{\\\"msg";

/// Byte terminating a record in the capture container
pub const SENTINEL: u8 = 0x00;

pub const DEFAULT_PAGE_SIZE: usize = 1024 * 1024;

/// Bytes kept before the newest page so a marker at its head still has
/// its length prefix in the window
const LOOKBACK: usize = 16;

#[derive(Debug, Clone)]
pub struct CaptureScanner {
    page_size: usize,
    include_ping_pong: bool,
}

impl Default for CaptureScanner {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            include_ping_pong: false,
        }
    }
}

/// Recovered messages plus scan statistics
#[derive(Debug, Clone, Default)]
pub struct CaptureScan {
    pub messages: Vec<Message>,
    /// Markers followed by a sentinel
    pub candidates: usize,
    /// Candidates without a length-consistent record start
    pub rejected: usize,
    /// Accepted ranges that did not decode as a message
    pub undecodable: usize,
}

impl CaptureScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size is clamped so a marker always fits in one page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(MESSAGE_MARKER.len());
        self
    }

    pub fn include_ping_pong(mut self, include: bool) -> Self {
        self.include_ping_pong = include;
        self
    }

    pub fn scan_file(&self, path: impl AsRef<Path>) -> DdpResult<CaptureScan> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let scan = self.scan_reader(BufReader::new(file))?;
        info!(
            "[Capture] {}: {} messages from {} candidates ({} rejected)",
            path.display(),
            scan.messages.len(),
            scan.candidates,
            scan.rejected
        );
        Ok(scan)
    }

    pub fn scan_reader<R: Read>(&self, mut reader: R) -> DdpResult<CaptureScan> {
        let mut scan = CaptureScan::default();
        let mut window: Vec<u8> = Vec::with_capacity(self.page_size * 2);
        // absolute file offset of window[0]
        let mut base: u64 = 0;
        // where the next marker search starts, relative to the window
        let mut cursor = 0usize;
        let mut eof = self.append_page(&mut reader, &mut window)?;

        loop {
            if !eof {
                eof = self.append_page(&mut reader, &mut window)?;
            }

            while let Some(marker) = find(&window[cursor..], MESSAGE_MARKER).map(|p| p + cursor) {
                let mut searched = marker;
                let sentinel = loop {
                    if let Some(p) = window[searched..].iter().position(|&b| b == SENTINEL) {
                        break Some(searched + p);
                    }
                    if eof {
                        break None;
                    }
                    searched = window.len();
                    eof = self.append_page(&mut reader, &mut window)?;
                };

                let Some(sentinel) = sentinel else {
                    trace!("[Capture] Unterminated marker at {}", base + marker as u64);
                    cursor = window.len();
                    break;
                };

                scan.candidates += 1;
                match record_start(&window, marker, sentinel) {
                    Some(start) => {
                        self.accept(&window[start..sentinel], &mut scan);
                        cursor = sentinel + 1;
                    }
                    None => {
                        let err = DdpError::CaptureParseAmbiguity {
                            offset: base + marker as u64,
                        };
                        debug!("[Capture] {}", err);
                        scan.rejected += 1;
                        cursor = marker + 1;
                    }
                }
            }

            if eof {
                break;
            }

            // Markers can only start in the unsearched tail
            cursor = cursor.max(window.len().saturating_sub(MESSAGE_MARKER.len() - 1));

            // Keep the newest page as the first segment of the next window
            let keep_from = window.len().saturating_sub(self.page_size + LOOKBACK);
            window.drain(..keep_from);
            base += keep_from as u64;
            cursor = cursor.saturating_sub(keep_from);
        }

        Ok(scan)
    }

    /// Read up to one page; returns true at end of input
    fn append_page<R: Read>(&self, reader: &mut R, window: &mut Vec<u8>) -> DdpResult<bool> {
        let start = window.len();
        window.resize(start + self.page_size, 0);
        let mut filled = 0;
        while filled < self.page_size {
            let n = reader.read(&mut window[start + filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        window.truncate(start + filled);
        Ok(filled < self.page_size)
    }

    fn accept(&self, bytes: &[u8], scan: &mut CaptureScan) {
        let text = String::from_utf8_lossy(bytes);
        let messages = match codec::decode_frame(&text) {
            Ok(Frame::Messages(messages)) => messages,
            Ok(_) | Err(_) => {
                scan.undecodable += 1;
                return;
            }
        };
        for message in messages {
            match message {
                Ok(message) if self.keep(&message) => scan.messages.push(message),
                Ok(_) => {}
                Err(e) => {
                    trace!("[Capture] Undecodable record: {}", e);
                    scan.undecodable += 1;
                }
            }
        }
    }

    fn keep(&self, message: &Message) -> bool {
        self.include_ping_pong || !matches!(message.kind(), MessageKind::Ping | MessageKind::Pong)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn be32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Scan backward from the marker for the position preceded by the
/// big-endian pair `[len + 8][len]`, `len` within one byte of the record
/// length up to the sentinel.
fn record_start(window: &[u8], marker: usize, sentinel: usize) -> Option<usize> {
    if marker < 8 {
        return None;
    }
    (8..=marker).rev().find(|&start| {
        let near = be32(&window[start - 4..start]) as i64;
        let far = be32(&window[start - 8..start - 4]) as i64;
        if far - near != 8 {
            return false;
        }
        let length = (sentinel - start) as i64;
        (near - length).abs() <= 1
    })
}
