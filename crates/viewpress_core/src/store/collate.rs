//! View key collation.
//!
//! Keys order as `null < false < true < numbers < strings < arrays < objects`.
//! Arrays compare element-wise, then by length, so `["categories"]` sorts
//! before every `["categories", ..]` key and `["categories", {}]` after them.
//! Strings compare by code point; locale-aware collation is not attempted.

use serde_json::Value;
use std::cmp::Ordering;

/// Total order over view keys.
pub fn collate(left: &Value, right: &Value) -> Ordering {
    let by_rank = rank(left).cmp(&rank(right));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| collate(x, y))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => a
            .iter()
            .zip(b.iter())
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| collate(va, vb)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => Ordering::Equal,
    }
}

/// Orders view rows by key, then by document id.
pub fn collate_row(left: (&Value, &str), right: (&Value, &str)) -> Ordering {
    collate(left.0, right.0).then_with(|| left.1.cmp(right.1))
}

/// Returns whether `(key, id)` lies inside a scan range.
///
/// For descending scans `start` is the upper bound and `end` the lower one.
pub fn in_range(
    key: &Value,
    id: &str,
    start: Option<(&Value, Option<&str>)>,
    end: Option<&Value>,
    inclusive_end: bool,
    descending: bool,
) -> bool {
    let after_start = match start {
        None => true,
        Some((start_key, start_doc_id)) => {
            let ordering = match start_doc_id {
                Some(doc_id) => collate_row((key, id), (start_key, doc_id)),
                None => collate(key, start_key),
            };
            if descending {
                ordering != Ordering::Greater
            } else {
                ordering != Ordering::Less
            }
        }
    };

    let before_end = match end {
        None => true,
        Some(end_key) => {
            let ordering = collate(key, end_key);
            match (descending, inclusive_end) {
                (false, true) => ordering != Ordering::Greater,
                (false, false) => ordering == Ordering::Less,
                (true, true) => ordering != Ordering::Less,
                (true, false) => ordering == Ordering::Greater,
            }
        }
    };

    after_start && before_end
}

/// Truncates an array key to its first `level` elements.
///
/// Level `0` collapses every key into `null`; non-array keys group as-is.
pub fn group_key(key: &Value, level: u32) -> Value {
    if level == 0 {
        return Value::Null;
    }
    match key {
        Value::Array(items) => {
            Value::Array(items.iter().take(level as usize).cloned().collect())
        }
        other => other.clone(),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::{collate, group_key, in_range};
    use serde_json::json;
    use std::cmp::Ordering;

    #[test]
    fn type_ranks_order_before_values() {
        let ordered = [
            json!(null),
            json!(false),
            json!(true),
            json!(-3),
            json!(10.5),
            json!("a"),
            json!(["a"]),
            json!({}),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(collate(&pair[0], &pair[1]), Ordering::Less, "{pair:?}");
        }
    }

    #[test]
    fn empty_object_is_a_high_sentinel_for_array_prefixes() {
        let start = json!(["categories"]);
        let end = json!(["categories", {}]);
        let row = json!(["categories", "zzz", "post-1"]);
        assert_eq!(collate(&start, &row), Ordering::Less);
        assert_eq!(collate(&row, &end), Ordering::Less);
        assert_eq!(collate(&json!(["categoriez"]), &end), Ordering::Greater);
    }

    #[test]
    fn in_range_honours_exclusive_end_and_doc_id_tie_break() {
        let key = json!("b");
        assert!(in_range(&key, "x", None, Some(&json!("b")), true, false));
        assert!(!in_range(&key, "x", None, Some(&json!("b")), false, false));
        assert!(!in_range(
            &key,
            "a",
            Some((&json!("b"), Some("m"))),
            None,
            true,
            false
        ));
        assert!(in_range(
            &key,
            "z",
            Some((&json!("b"), Some("m"))),
            None,
            true,
            false
        ));
    }

    #[test]
    fn in_range_flips_bounds_when_descending() {
        let key = json!("b");
        assert!(in_range(&key, "b", Some((&json!("c"), None)), None, true, true));
        assert!(!in_range(&key, "b", Some((&json!("a"), None)), None, true, true));
        assert!(!in_range(&key, "b", None, Some(&json!("b")), false, true));
    }

    #[test]
    fn group_key_truncates_array_keys() {
        let key = json!(["categories", "rust", "p1"]);
        assert_eq!(group_key(&key, 2), json!(["categories", "rust"]));
        assert_eq!(group_key(&key, 0), json!(null));
        assert_eq!(group_key(&json!("plain"), 2), json!("plain"));
    }
}
