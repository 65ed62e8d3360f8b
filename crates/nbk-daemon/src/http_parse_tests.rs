// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request(lines: &[&str]) -> Vec<u8> {
    let mut s = lines.join("\r\n");
    s.push_str("\r\n\r\n");
    s.into_bytes()
}

#[test]
fn parses_path_kernel_id_and_ws_key() {
    let buf = request(&[
        "GET /api/v1/nbk/ws/?kernel-id=k1 HTTP/1.1",
        "Host: example.com",
        "Upgrade: websocket",
        "Connection: Upgrade",
        "Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==",
        "Sec-WebSocket-Version: 13",
    ]);

    let parsed = parse_request(&buf).expect("parse");
    assert_eq!(parsed.path, "/api/v1/nbk/ws/");
    assert_eq!(parsed.kernel_id.as_deref(), Some("k1"));
    assert_eq!(parsed.ws_key.as_deref(), Some("dGhlIHNhbXBsZSBub25jZQ=="));
    assert_eq!(parsed.user_header, None);
}

#[test]
fn reads_user_header_case_insensitively() {
    let buf = request(&["GET /api/v1/nbk/ws/?kernel-id=k1 HTTP/1.1", "X-User-Id: u42", "Sec-WebSocket-Key: abc"]);
    let parsed = parse_request(&buf).expect("parse");
    assert_eq!(parsed.user_header.as_deref(), Some("u42"));
}

#[test]
fn missing_kernel_id_query_param_yields_none_not_error() {
    let buf = request(&["GET /api/v1/nbk/ws/ HTTP/1.1", "Sec-WebSocket-Key: abc"]);
    let parsed = parse_request(&buf).expect("parse");
    assert_eq!(parsed.kernel_id, None);
}

#[test]
fn multiple_query_params_are_all_reachable() {
    let buf = request(&["GET /ws/?foo=bar&kernel-id=k9&baz=qux HTTP/1.1", "Sec-WebSocket-Key: abc"]);
    let parsed = parse_request(&buf).expect("parse");
    assert_eq!(parsed.kernel_id.as_deref(), Some("k9"));
}

#[test]
fn malformed_request_line_is_an_error() {
    let buf = b"not an http request at all\r\n\r\n".to_vec();
    assert!(parse_request(&buf).is_err());
}

#[test]
fn query_param_helper_handles_absent_key() {
    assert_eq!(query_param("a=1&b=2", "c"), None);
    assert_eq!(query_param("a=1&b=2", "b"), Some("2"));
}
