//! Ordering Tests
//!
//! The comparator and the codec must agree: sorting tuples directly and
//! sorting their encodings yields the same order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use proptest::prelude::*;
use tupledb::{compare_tuple, compare_value, encode_tuple, EncodingOptions, Tuple, Value};

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn true_sorts_after_false_in_last_component() {
    let options = EncodingOptions::default();
    let a: Tuple = vec![Value::from(1), Value::from("a"), Value::from(true)];
    let b: Tuple = vec![Value::from(1), Value::from("a"), Value::from(false)];

    assert_eq!(compare_tuple(&a, &b), Ordering::Greater);
    assert!(encode_tuple(&a, &options).unwrap() > encode_tuple(&b, &options).unwrap());
}

#[test]
fn shorter_prefix_sorts_first() {
    let options = EncodingOptions::default();
    let a: Tuple = vec![Value::from("a")];
    let b: Tuple = vec![Value::from("a"), Value::from("a")];

    assert_eq!(compare_tuple(&a, &b), Ordering::Less);
    assert!(encode_tuple(&a, &options).unwrap() < encode_tuple(&b, &options).unwrap());
}

#[test]
fn type_rank_order() {
    let mut object = BTreeMap::new();
    object.insert("k".to_string(), Value::from(1));
    let ranked = vec![
        Value::Null,
        Value::from(object),
        Value::from(vec![Value::from(1)]),
        Value::from(-1e300),
        Value::from(""),
        Value::from(false),
    ];
    for pair in ranked.windows(2) {
        assert_eq!(compare_value(&pair[0], &pair[1]), Ordering::Less, "{pair:?}");
    }
}

#[test]
fn negative_zero_equals_zero() {
    assert_eq!(compare_value(&Value::from(-0.0), &Value::from(0.0)), Ordering::Equal);
    let options = EncodingOptions::default();
    assert_eq!(
        encode_tuple(&[Value::from(-0.0)], &options).unwrap(),
        encode_tuple(&[Value::from(0.0)], &options).unwrap()
    );
}

// ============================================================================
// Properties
// ============================================================================

fn arb_component() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-c\\x00\\x01]{0,3}".prop_map(Value::from),
    ]
}

proptest! {
    #[test]
    fn sorting_encodings_matches_sorting_tuples(
        tuples in prop::collection::vec(prop::collection::vec(arb_component(), 0..4), 0..20)
    ) {
        let options = EncodingOptions::default();
        let mut direct = tuples.clone();
        direct.sort_by(|a, b| compare_tuple(a, b));

        let mut encoded: Vec<(String, Tuple)> = tuples
            .into_iter()
            .map(|t| (encode_tuple(&t, &options).unwrap(), t))
            .collect();
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
        let via_codec: Vec<Tuple> = encoded.into_iter().map(|(_, t)| t).collect();

        prop_assert_eq!(direct.len(), via_codec.len());
        for (a, b) in direct.iter().zip(via_codec.iter()) {
            prop_assert_eq!(compare_tuple(a, b), Ordering::Equal);
        }
    }
}
