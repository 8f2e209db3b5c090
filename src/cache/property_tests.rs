//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the key codec and the record operations over
//! arbitrary keys and values.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use proptest::prelude::*;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use crate::cache::{generate_key, validate_segment_name, CacheKey, Connection};
use crate::config::Config;
use crate::engine::MemoryEngine;

// == Strategies ==
/// Any non-empty string without a null character
fn valid_part_strategy() -> impl Strategy<Value = String> {
    "[^\\x00]{1,32}"
}

fn valid_key_strategy() -> impl Strategy<Value = CacheKey> {
    (valid_part_strategy(), valid_part_strategy())
        .prop_map(|(segment, id)| CacheKey::new(segment, id))
}

/// Nested JSON documents of modest size
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| json!(map)),
        ]
    })
}

fn started_connection(rt: &Runtime) -> Connection {
    let conn = Connection::new(Config::default(), Arc::new(MemoryEngine::new())).unwrap();
    rt.block_on(conn.start()).unwrap();
    conn
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Decoding a storage id gives back segment followed by id.
    #[test]
    fn prop_generate_key_decodes_to_parts(key in valid_key_strategy()) {
        let encoded = generate_key(&key);
        let decoded = percent_decode_str(&encoded).decode_utf8().unwrap();
        prop_assert_eq!(decoded.into_owned(), format!("{}{}", key.segment, key.id));
    }

    // Storage ids never carry path separators, spaces or control characters.
    #[test]
    fn prop_generate_key_is_escaped(key in valid_key_strategy()) {
        let encoded = generate_key(&key);
        prop_assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.!~*'()%".contains(c)));
    }

    #[test]
    fn prop_segment_name_rule(prefix in "[^\\x00]{0,8}", suffix in "[^\\x00]{0,8}") {
        let with_null = format!("{prefix}\u{0}{suffix}");
        prop_assert!(validate_segment_name(&with_null).is_err());

        let plain = format!("{prefix}{suffix}");
        prop_assert_eq!(validate_segment_name(&plain).is_ok(), !plain.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // set followed by get returns the same item and ttl.
    #[test]
    fn prop_set_then_get_roundtrip(
        key in valid_key_strategy(),
        value in json_strategy(),
        ttl in 1_000u64..10_000_000
    ) {
        let rt = Runtime::new().unwrap();
        let conn = started_connection(&rt);

        rt.block_on(conn.set(&key, &value, ttl)).unwrap();
        let envelope = rt.block_on(conn.get(&key)).unwrap();

        prop_assert!(envelope.is_some(), "Stored key should be a hit");
        let envelope = envelope.unwrap();
        prop_assert_eq!(envelope.item, value);
        prop_assert_eq!(envelope.ttl, ttl);
        conn.stop();
    }

    // A second set replaces the first value entirely.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in json_strategy(),
        second in json_strategy()
    ) {
        let rt = Runtime::new().unwrap();
        let conn = started_connection(&rt);

        rt.block_on(conn.set(&key, &first, 60_000)).unwrap();
        rt.block_on(conn.set(&key, &second, 60_000)).unwrap();
        let envelope = rt.block_on(conn.get(&key)).unwrap().unwrap();

        prop_assert_eq!(envelope.item, second);
        conn.stop();
    }

    // Drop removes a stored key and is harmless on a missing one.
    #[test]
    fn prop_drop_removes_entry(key in valid_key_strategy(), value in json_strategy()) {
        let rt = Runtime::new().unwrap();
        let conn = started_connection(&rt);

        rt.block_on(conn.set(&key, &value, 60_000)).unwrap();
        rt.block_on(conn.drop(&key)).unwrap();
        prop_assert!(rt.block_on(conn.get(&key)).unwrap().is_none());
        prop_assert!(rt.block_on(conn.drop(&key)).is_ok());
        conn.stop();
    }
}
