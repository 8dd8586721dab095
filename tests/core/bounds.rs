//! Bounds Tests
//!
//! Range semantics shared by every scan, the concurrency log and
//! subscriptions.

use crate::common::*;
use tupledb::{sorted, Error};

fn sorted_tuples(items: &[&[&str]]) -> Vec<Tuple> {
    let mut list = Vec::new();
    for item in items {
        sorted::set(&mut list, tuple(item));
    }
    list
}

#[test]
fn prefix_covers_prefix_and_descendants_only() {
    let bounds = Bounds::prefix(tuple(&["users"])).normalize();
    assert!(bounds.contains(&tuple(&["users"])));
    assert!(bounds.contains(&tuple(&["users", "ada"])));
    assert!(bounds.contains(&tuple(&["users", "ada", "email"])));
    assert!(!bounds.contains(&tuple(&["user"])));
    assert!(!bounds.contains(&tuple(&["usersx"])));
    assert!(!bounds.contains(&tuple(&["posts"])));
}

#[test]
fn range_endpoints_are_relative_to_prefix() {
    let bounds = Bounds::prefix(tuple(&["users"]))
        .gte(tuple(&["b"]))
        .lt(tuple(&["d"]))
        .normalize();
    assert!(!bounds.contains(&tuple(&["users", "a"])));
    assert!(bounds.contains(&tuple(&["users", "b"])));
    assert!(bounds.contains(&tuple(&["users", "c", "x"])));
    assert!(!bounds.contains(&tuple(&["users", "d"])));
    assert!(!bounds.contains(&tuple(&["b"])));
}

#[test]
fn scan_half_open_range() {
    let list = sorted_tuples(&[&["a"], &["b"], &["b", "x"], &["c"], &["d"]]);
    let bounds = Bounds::new().gte(tuple(&["b"])).lt(tuple(&["d"])).normalize();
    assert_eq!(
        sorted::scan(&list, &bounds).unwrap(),
        vec![tuple(&["b"]), tuple(&["b", "x"]), tuple(&["c"])]
    );
}

#[test]
fn reverse_limit_takes_last_items() {
    let list = sorted_tuples(&[&["a"], &["b"], &["c"], &["d"]]);
    let bounds = Bounds::new().reverse().limit(2).normalize();
    assert_eq!(
        sorted::scan(&list, &bounds).unwrap(),
        vec![tuple(&["d"]), tuple(&["c"])]
    );
}

#[test]
fn inverted_range_is_rejected() {
    let list = sorted_tuples(&[&["a"]]);
    let bounds = Bounds::new().gt(tuple(&["z"])).lt(tuple(&["a"])).normalize();
    assert!(matches!(
        sorted::scan(&list, &bounds),
        Err(Error::InvalidBounds { .. })
    ));
}
