// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_ids_carry_the_type_prefix() {
    let id = AgentId::new();
    assert!(id.as_str().starts_with("agt-"));
}

#[test]
fn from_string_round_trips() {
    let id = AgentId::from_string("agt-custom123");
    assert_eq!(id.as_str(), "agt-custom123");
    assert_eq!(id.to_string(), "agt-custom123");
}

#[test]
fn two_generated_ids_differ() {
    assert_ne!(AgentId::new(), AgentId::new());
}

#[test]
fn ids_deserialize_as_transparent_strings() {
    let json = serde_json::to_string(&LeaseId::from_string("lse-abc")).unwrap();
    assert_eq!(json, "\"lse-abc\"");
    let back: LeaseId = serde_json::from_str(&json).unwrap();
    assert_eq!(back.as_str(), "lse-abc");
}
