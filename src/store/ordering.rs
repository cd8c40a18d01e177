//! Sort ordering
//!
//! Records are ordered by the value at one field:
//! - records missing the field go after every record that has it
//! - two numbers or two strings compare normally; integers compare exactly,
//!   floats by value
//! - values of differing types are not ordered relative to each other and
//!   keep the position they were encountered in
//!
//! The last rule makes the comparison partial, so sorting goes through a
//! stable merge sort driven by a strict "comes before" predicate instead of
//! `slice::sort_by`, which requires a total order.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::Record;

/// Compare two values of the same sortable type; `None` means unordered
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Compare two numbers
///
/// Two integers compare exactly, so distinct values above 2^53 stay distinct.
/// Only a pair involving a float goes through `f64`.
pub(super) fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    if !x.is_f64() && !y.is_f64() {
        // A negative i64 against a u64 above i64::MAX
        return Some(if x.as_i64().is_some() {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

/// Order records by the value at `key`
pub fn sort_by_key(records: Vec<Record>, key: &str) -> Vec<Record> {
    let (keyed, missing): (Vec<Record>, Vec<Record>) =
        records.into_iter().partition(|record| record.contains_key(key));

    let comes_before = |a: &Record, b: &Record| match (a.get(key), b.get(key)) {
        (Some(x), Some(y)) => compare_values(x, y) == Some(Ordering::Less),
        _ => false,
    };

    let mut sorted = merge_sort(keyed, &comes_before);
    sorted.extend(missing);
    sorted
}

/// Stable merge sort; the right element is taken only when it strictly
/// comes before the left one
fn merge_sort<T, F>(mut items: Vec<T>, comes_before: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> bool,
{
    if items.len() <= 1 {
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let mut left = merge_sort(items, comes_before).into_iter().peekable();
    let mut right = merge_sort(right, comes_before).into_iter().peekable();

    let mut merged = Vec::with_capacity(left.len() + right.len());
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => comes_before(r, l),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged
}
