//! Filter matching
//!
//! A record matches when every filter field is present with a structurally
//! equal value.

use std::cmp::Ordering;

use serde_json::Value;

use super::ordering::compare_numbers;
use super::{Filter, Record};

/// Check whether `record` satisfies every field of `filter`
pub fn matches_filter(record: &Record, filter: &Filter) -> bool {
    filter.iter().all(|(field, expected)| {
        record
            .get(field)
            .is_some_and(|actual| values_equal(actual, expected))
    })
}

/// Deep equality over JSON values.
///
/// Numbers compare by numeric value, so `1` and `1.0` are equal; two
/// integers must match exactly. Arrays compare element-wise in order,
/// objects key-wise regardless of order.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(key, x)| ym.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
