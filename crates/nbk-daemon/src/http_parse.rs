// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal hand-rolled HTTP/1.1 Upgrade handshake, used instead of
//! pulling in a full web framework for the websocket endpoint's single
//! route (spec.md §6, `SPEC_FULL.md` §4.7.F). `httparse` handles the
//! request-line/header grammar; this module owns only the narrow slice of
//! semantics the upgrade path needs — the path, the `kernel-id` query
//! parameter, the `Sec-WebSocket-Key`, and the user-id header — rather
//! than a general-purpose request type.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Hard cap on the buffered request head, to bound memory for a
/// malicious or broken client that never sends `\r\n\r\n`.
const MAX_REQUEST_HEAD_BYTES: usize = 8 * 1024;

/// The fields this daemon's single upgrade route actually needs, extracted
/// from a parsed HTTP/1.1 request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub path: String,
    pub kernel_id: Option<String>,
    pub ws_key: Option<String>,
    pub user_header: Option<String>,
}

/// Reads off `stream` until a full HTTP request head (`\r\n\r\n`-terminated)
/// has been buffered. Assumes the client sends no body and no websocket
/// frames before it has seen the 101 response — true for every compliant
/// upgrade client, so nothing past the header terminator is ever read here.
pub async fn read_request_head(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed during handshake"));
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Ok(buf);
        }
        if buf.len() > MAX_REQUEST_HEAD_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "request head exceeded size limit"));
        }
    }
}

/// Parses a buffered request head into the fields the upgrade handler
/// needs. Returns `Err` only for a malformed/incomplete HTTP request —
/// a missing `kernel-id` or `Sec-WebSocket-Key` is reported via `None` on
/// the respective field, since the caller has its own per-field error
/// messages to report back to the client (spec.md §7's `BadRequest`).
pub fn parse_request(buf: &[u8]) -> Result<UpgradeRequest, String> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    let status = req.parse(buf).map_err(|e| format!("malformed http request: {e}"))?;
    if status.is_partial() {
        return Err("incomplete http request".to_string());
    }

    let path_and_query = req.path.ok_or_else(|| "missing request path".to_string())?;
    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p.to_string(), Some(q.to_string())),
        None => (path_and_query.to_string(), None),
    };

    let kernel_id = query.as_deref().and_then(|q| query_param(q, "kernel-id")).map(str::to_string);
    let ws_key = find_header(req.headers, "sec-websocket-key");
    let user_header = find_header(req.headers, "x-user-id");

    Ok(UpgradeRequest { path, kernel_id, ws_key, user_header })
}

fn find_header(headers: &[httparse::Header<'_>], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| String::from_utf8_lossy(h.value).trim().to_string())
}

/// Extracts `key`'s value from a `&`-separated, unescaped query string.
/// The block/kernel ids this daemon deals with never need percent-decoding
/// in practice (they're client-chosen opaque tokens), so this stays a
/// plain split rather than pulling in a URL-encoding crate.
fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').filter_map(|kv| kv.split_once('=')).find(|(k, _)| *k == key).map(|(_, v)| v)
}

/// Writes a minimal `HTTP/1.1 <status>` error response with a plain-text
/// body and `Connection: close`.
pub async fn write_http_error(stream: &mut TcpStream, status: &str, message: &str) -> io::Result<()> {
    let body = message.as_bytes();
    let head = format!("HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\nContent-Type: text/plain\r\n\r\n", body.len());
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await
}

/// Writes the `101 Switching Protocols` response completing the websocket
/// handshake, deriving `Sec-WebSocket-Accept` via `tungstenite`'s own
/// handshake helper (reached through `tokio-tungstenite`'s re-export —
/// avoids pulling in a separate sha1/base64 dependency for one computation).
pub async fn write_switching_protocols(stream: &mut TcpStream, ws_key: &str) -> io::Result<()> {
    let accept = tokio_tungstenite::tungstenite::handshake::derive_accept_key(ws_key.as_bytes());
    let head = format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    );
    stream.write_all(head.as_bytes()).await
}

#[cfg(test)]
#[path = "http_parse_tests.rs"]
mod tests;
