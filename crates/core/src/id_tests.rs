// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

// --- define_id! macro tests ---

crate::define_id! {
 /// Test ID type for macro verification.
    pub struct TestId("tst-");
}

#[test]
fn define_id_hash_map_lookup_by_borrowed_str() {
    let id = TestId::new();
    let mut map = HashMap::new();
    map.insert(id, 42);
    assert_eq!(map.get(id.as_str()), Some(&42));
}

#[test]
fn define_id_round_trips_through_string() {
    let id = TestId::from_string("tst-abcdefghijklmnop123");
    assert_eq!(TestId::from_string(id.to_string()), id);
}

#[test]
fn define_id_suffix_strips_prefix() {
    let id = TestId::from_string("tst-abcdefghijklmnop123");
    assert_eq!(id.suffix(), "abcdefghijklmnop123");
}

// --- short() tests ---

#[test]
fn define_id_short_truncates_the_suffix() {
    let id = TestId::from_string("tst-abcdefghijklmnop123");
    assert_eq!(id.short(4), "abcd");
}

#[test]
fn define_id_short_returns_full_suffix_when_shorter_than_n() {
    let id = TestId::from_string("tst-abc");
    assert_eq!(id.short(8), "abc");
}

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}
