//! Reads and writes against the JSON state tree.

use crate::error::{HubError, Result};
use crate::state::StatePath;
use serde_json::{Map, Value};

/// Parse a segment as an array index.
fn array_index(segment: &str) -> Option<usize> {
    segment.parse::<usize>().ok()
}

/// Look up the value at `path`.
///
/// Objects are indexed by key and arrays by decimal position. Any missing
/// segment, or a segment applied to a scalar, yields `None`. The empty path
/// yields `None`.
pub fn lookup<'a>(root: &'a Value, path: &StatePath) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    path.segments()
        .iter()
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => array_index(segment).and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Write `value` at `path`, or delete the leaf key when `value` is `None`.
///
/// Returns whether the tree changed, by structural comparison. Missing
/// intermediate objects are created for writes but never for deletes.
pub fn write(root: &mut Value, path: &StatePath, value: Option<Value>) -> Result<bool> {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return Ok(false);
    };
    let conflict = || HubError::PathConflict(path.to_string());

    let mut node = root;
    for segment in parents {
        node = match node {
            Value::Object(map) => {
                if value.is_none() && !map.contains_key(segment) {
                    return Ok(false);
                }
                map.entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()))
            }
            Value::Array(items) => match array_index(segment).and_then(|i| items.get_mut(i)) {
                Some(child) => child,
                None if value.is_none() => return Ok(false),
                None => return Err(conflict()),
            },
            _ if value.is_none() => return Ok(false),
            _ => return Err(conflict()),
        };
    }

    match (node, value) {
        (Value::Object(map), None) => Ok(map.remove(leaf).is_some()),
        (Value::Object(map), Some(value)) => {
            if map.get(leaf) == Some(&value) {
                return Ok(false);
            }
            map.insert(leaf.clone(), value);
            Ok(true)
        }
        (Value::Array(items), Some(value)) => {
            let slot = array_index(leaf)
                .and_then(|i| items.get_mut(i))
                .ok_or_else(conflict)?;
            let changed = *slot != value;
            *slot = value;
            Ok(changed)
        }
        // Array elements cannot be removed by path; that would shift siblings.
        (Value::Array(_), None) => Err(conflict()),
        (_, None) => Ok(false),
        (_, Some(_)) => Err(conflict()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn path(raw: &str) -> StatePath {
        StatePath::parse(raw).unwrap()
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut root = json!({});
        assert!(write(&mut root, &path("paging.next"), Some(json!("/p2"))).unwrap());
        assert_eq!(root, json!({"paging": {"next": "/p2"}}));
    }

    #[test]
    fn test_set_equal_value_is_no_change() {
        let mut root = json!({"a": {"b": [1, 2]}});
        assert!(!write(&mut root, &path("a.b"), Some(json!([1, 2]))).unwrap());
        assert!(write(&mut root, &path("a.b"), Some(json!([2, 1]))).unwrap());
    }

    #[test]
    fn test_equality_ignores_key_order() {
        let mut root = json!({"paging": {"total": 1, "next": null}});
        let reordered: Value = serde_json::from_str(r#"{"next": null, "total": 1}"#).unwrap();
        assert!(!write(&mut root, &path("paging"), Some(reordered)).unwrap());
    }

    #[test]
    fn test_unset_removes_leaf() {
        let mut root = json!({"a": {"b": 1, "c": 2}});
        assert!(write(&mut root, &path("a.b"), None).unwrap());
        assert_eq!(root, json!({"a": {"c": 2}}));
        assert!(!write(&mut root, &path("a.b"), None).unwrap());
    }

    #[test]
    fn test_unset_does_not_create_intermediates() {
        let mut root = json!({});
        assert!(!write(&mut root, &path("x.y.z"), None).unwrap());
        assert_eq!(root, json!({}));
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let root = json!({"a": {"b": 1}});
        assert_eq!(lookup(&root, &path("a.c")), None);
        assert_eq!(lookup(&root, &path("a.b.c")), None);
        assert_eq!(lookup(&root, &path("nope.deeper")), None);
        assert_eq!(lookup(&root, &StatePath::empty()), None);
    }

    #[test]
    fn test_lookup_array_index() {
        let root = json!({"items": ["a", "b"]});
        assert_eq!(lookup(&root, &path("items.1")), Some(&json!("b")));
        assert_eq!(lookup(&root, &path("items.9")), None);
    }

    #[test]
    fn test_write_through_scalar_conflicts() {
        let mut root = json!({"title": "x"});
        assert!(matches!(
            write(&mut root, &path("title.sub"), Some(json!(1))),
            Err(HubError::PathConflict(_))
        ));
    }

    #[test]
    fn test_write_array_element() {
        let mut root = json!({"items": ["a", "b"]});
        assert!(write(&mut root, &path("items.0"), Some(json!("z"))).unwrap());
        assert_eq!(root["items"], json!(["z", "b"]));
        assert!(write(&mut root, &path("items.5"), Some(json!("q"))).is_err());
        assert!(write(&mut root, &path("items.0"), None).is_err());
    }

    fn leaf_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
            prop::collection::vec(any::<u8>(), 0..4).prop_map(|v| json!(v)),
        ]
    }

    proptest! {
        #[test]
        fn prop_set_then_get(
            segments in prop::collection::vec("[a-z]{1,4}", 1..5),
            value in leaf_value(),
        ) {
            let mut root = json!({});
            let path = StatePath::from_segments(segments).unwrap();
            write(&mut root, &path, Some(value.clone())).unwrap();
            prop_assert_eq!(lookup(&root, &path), Some(&value));
        }

        #[test]
        fn prop_unset_then_get(
            segments in prop::collection::vec("[a-z]{1,4}", 1..5),
            value in leaf_value(),
        ) {
            let mut root = json!({});
            let path = StatePath::from_segments(segments).unwrap();
            write(&mut root, &path, Some(value)).unwrap();
            prop_assert!(write(&mut root, &path, None).unwrap());
            prop_assert_eq!(lookup(&root, &path), None);
        }
    }
}
