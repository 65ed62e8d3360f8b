// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nbk_core::test_support::{block_id, kernel_id};

#[test]
fn failure_message_carries_text_and_fail_flag() {
    let msg = KernelMessage::failure(kernel_id("k1"), block_id("b1"), "error compiling: parse error: bad");
    assert!(msg.fail);
    assert_eq!(msg.result, serde_json::json!("error compiling: parse error: bad"));
}

#[test]
fn success_message_carries_arbitrary_result_payload() {
    let msg = KernelMessage::success(kernel_id("k1"), block_id("b1"), serde_json::json!({"value": 42}));
    assert!(!msg.fail);
    assert_eq!(msg.result["value"], 42);
}

#[test]
fn round_trips_through_json() {
    let msg = KernelMessage::success(kernel_id("k1"), block_id("b1"), serde_json::json!("ok"));
    let encoded = serde_json::to_string(&msg).expect("encode");
    let decoded: KernelMessage = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(msg, decoded);
}

#[test]
fn decode_of_malformed_json_fails() {
    let err = serde_json::from_str::<KernelMessage>("{not json");
    assert!(err.is_err());
}
