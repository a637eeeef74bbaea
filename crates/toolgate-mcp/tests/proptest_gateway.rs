//! Gateway property-based tests.
//!
//! ## Purpose
//! These tests exercise the invocation pipeline with randomized tool names,
//! credentials, and arguments. They prove that nothing about the registry or
//! the argument shape leaks to a caller who has not authenticated.
//!
//! ## What is covered
//! - Failed authentication produces one identical envelope regardless of tool
//!   existence or argument validity.
//! - Every invocation appends exactly one audit record.
//!
//! ## What is intentionally out of scope
//! - Transport framing (covered by the stdio and HTTP suites).
// crates/toolgate-mcp/tests/proptest_gateway.rs
// ============================================================================
// Module: Gateway Property-Based Tests
// Description: Randomized checks for pre-authentication indistinguishability.
// Purpose: Ensure unauthenticated callers cannot probe the registry.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use toolgate_mcp::Credential;
use toolgate_mcp::InMemoryAuditSink;
use toolgate_mcp::InvocationRequest;

mod common;
use crate::common::ALICE_TOKEN;
use crate::common::BOB_TOKEN;
use crate::common::math_gateway;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

fn tool_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("add".to_string()),
        Just("whoami".to_string()),
        Just("explode".to_string()),
        "[a-z_]{1,24}",
    ]
}

fn arguments() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({ "a": 1, "b": 2 })),
        Just(json!({})),
        Just(Value::Null),
        Just(json!([1, 2, 3])),
        any::<i64>().prop_map(|n| json!({ "a": n })),
        "[ -~]{0,32}".prop_map(|text| json!({ "a": text, "extra": true })),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn unauthenticated_envelope_is_constant(
        tool in tool_name(),
        args in arguments(),
        token in proptest::option::of("[A-Za-z0-9._-]{1,48}"),
    ) {
        prop_assume!(token.as_deref() != Some(ALICE_TOKEN));
        prop_assume!(token.as_deref() != Some(BOB_TOKEN));
        let audit = Arc::new(InMemoryAuditSink::new());
        let gateway = math_gateway(&audit);
        let request = InvocationRequest::new(tool.clone(), args)
            .with_credential(token.map(Credential::new));
        let result = runtime().block_on(gateway.invoke(request));
        let envelope = result.to_envelope().to_value();
        prop_assert_eq!(
            envelope,
            json!({ "success": false, "error": "authentication failed", "code": "AUTH_FAILED" })
        );
        let records = audit.records();
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(records[0].subject.as_str(), "anonymous");
        prop_assert_eq!(records[0].tool_name.as_str(), tool.as_str());
    }

    #[test]
    fn authenticated_calls_always_audit_once(tool in tool_name(), args in arguments()) {
        let audit = Arc::new(InMemoryAuditSink::new());
        let gateway = math_gateway(&audit);
        let request = InvocationRequest::new(tool, args)
            .with_credential(Some(Credential::new(ALICE_TOKEN)));
        let result = runtime().block_on(gateway.invoke(request));
        let records = audit.records();
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(records[0].subject.as_str(), "alice");
        prop_assert_eq!(records[0].failure_code, result.failure_code());
    }
}
