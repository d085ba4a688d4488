// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Capture Recovery Tests
 * Message recovery from capture files and target extraction
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

use lonkero_ddp::capture::{
    default_ignored_operations, extract_targets, CaptureScanner, DumpFilter, MESSAGE_MARKER,
    SENTINEL,
};
use lonkero_ddp::ddp::codec;
use lonkero_ddp::ddp::{Message, MessageKind};

/// One record as a capture container stores a websocket payload:
/// `[len + 8][len][payload][sentinel]`, lengths big-endian
fn record(message: &Message, frame_letter: &[u8]) -> Vec<u8> {
    let mut payload = frame_letter.to_vec();
    payload.extend_from_slice(codec::encode(message).unwrap().as_bytes());
    let len = payload.len() as u32;

    let mut out = Vec::new();
    out.extend_from_slice(&(len + 8).to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.push(SENTINEL);
    out
}

/// Marker bytes with no consistent length header in front of them
fn decoy(filler: u8) -> Vec<u8> {
    let mut out = vec![filler; 24];
    out.extend_from_slice(MESSAGE_MARKER);
    out.extend_from_slice(br#"\":\"method\"}"]"#);
    out.push(SENTINEL);
    out
}

fn capture_file(chunks: &[Vec<u8>]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"\x0a\x0d\x0d\x0apcapng-ish header bytes").unwrap();
    for chunk in chunks {
        file.write_all(chunk).unwrap();
        file.write_all(&[0x5a; 11]).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_three_messages_two_decoys() {
    let login = Message::method("login", vec![json!({"resume": "tok"})]);
    let insert = Message::method("tasks.insert", vec![json!({"title": "a", "done": false})]);
    let sub = Message::sub("tasks.mine", vec![json!(10)]);

    let file = capture_file(&[
        record(&login, b""),
        decoy(0x01),
        record(&insert, b"a"),
        decoy(0x7f),
        record(&sub, b""),
    ]);

    let scan = CaptureScanner::new().scan_file(file.path()).unwrap();
    assert_eq!(scan.messages.len(), 3);
    assert_eq!(scan.rejected, 2);
    assert_eq!(scan.messages[1].operation_name(), Some("tasks.insert"));
    assert_eq!(scan.messages[2].kind(), MessageKind::Sub);
}

#[test]
fn test_small_pages_match_default_scan() {
    let messages: Vec<Message> = (0..40)
        .map(|i| Message::method(format!("m{}", i), vec![json!({"i": i, "pad": "x".repeat(i)})]))
        .collect();
    let chunks: Vec<Vec<u8>> = messages.iter().map(|m| record(m, b"a")).collect();
    let file = capture_file(&chunks);

    let full = CaptureScanner::new().scan_file(file.path()).unwrap();
    let paged = CaptureScanner::new()
        .with_page_size(97)
        .scan_file(file.path())
        .unwrap();
    assert_eq!(full.messages, messages);
    assert_eq!(paged.messages, messages);
}

#[test]
fn test_pings_dropped_unless_requested() {
    let file = capture_file(&[
        record(&Message::Ping { id: None }, b"a"),
        record(&Message::pong(None), b""),
        record(&Message::method("x", vec![]), b""),
    ]);

    assert_eq!(CaptureScanner::new().scan_file(file.path()).unwrap().messages.len(), 1);
    assert_eq!(
        CaptureScanner::new()
            .include_ping_pong(true)
            .scan_file(file.path())
            .unwrap()
            .messages
            .len(),
        3
    );
}

#[test]
fn test_targets_from_capture() {
    let file = capture_file(&[
        record(&Message::method("login", vec![json!({"resume": "t"})]), b""),
        record(&Message::method("orders.get", vec![json!("o-1")]), b""),
        record(&Message::method("orders.get", vec![json!("o-2")]), b""),
        record(&Message::method("orders.get", vec![json!({"id": "o-3"})]), b""),
        record(&Message::sub("orders", vec![]), b""),
    ]);

    let scan = CaptureScanner::new().scan_file(file.path()).unwrap();
    assert_eq!(DumpFilter::Methods.apply(&scan.messages).len(), 4);

    let targets = extract_targets(&scan.messages, &default_ignored_operations());
    let names: Vec<_> = targets
        .iter()
        .map(|t| (t.kind(), t.params().unwrap_or_default().len()))
        .collect();
    assert_eq!(
        names,
        vec![
            (MessageKind::Method, 1),
            (MessageKind::Method, 1),
            (MessageKind::Sub, 0)
        ]
    );
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(CaptureScanner::new()
        .scan_file("/nonexistent/capture.pcapng")
        .is_err());
}
