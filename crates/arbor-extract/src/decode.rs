//! Nested variable decoding.
//!
//! HTML forms can only submit flat names, so nested data is spelled out in
//! the names themselves: `user.name=ada&tags-0=a&tags-1=b` decodes to
//! `{"user": {"name": "ada"}, "tags": ["a", "b"]}`.

use arbor_core::{DecodeOptions, DispatchError, DispatchResult, Params};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

enum Step {
    Key(String),
    Index(usize),
}

enum Slot {
    Leaf(Value),
    Map(IndexMap<String, Slot>),
    List(BTreeMap<usize, Slot>),
}

impl Slot {
    fn insert(&mut self, steps: &[Step], value: Value) {
        let Some((step, rest)) = steps.split_first() else {
            *self = Self::Leaf(value);
            return;
        };
        match step {
            Step::Key(key) => {
                if !matches!(self, Self::Map(_)) {
                    *self = Self::Map(IndexMap::new());
                }
                if let Self::Map(map) = self {
                    map.entry(key.clone())
                        .or_insert(Self::Leaf(Value::Null))
                        .insert(rest, value);
                }
            }
            Step::Index(index) => {
                if !matches!(self, Self::List(_)) {
                    *self = Self::List(BTreeMap::new());
                }
                if let Self::List(list) = self {
                    list.entry(*index)
                        .or_insert(Self::Leaf(Value::Null))
                        .insert(rest, value);
                }
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Leaf(value) => value,
            Self::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, slot)| (k, slot.into_value()))
                    .collect::<Map<String, Value>>(),
            ),
            // Gaps in the indices collapse; order follows the index.
            Self::List(list) => Value::Array(list.into_values().map(Slot::into_value).collect()),
        }
    }
}

fn steps(key: &str, options: &DecodeOptions) -> DispatchResult<Vec<Step>> {
    if key.matches(options.dict_char).count() >= options.max_depth {
        return Err(too_deep(options));
    }
    let mut steps = Vec::new();
    for part in key.split(options.dict_char) {
        match part
            .rsplit_once(options.list_char)
            .and_then(|(name, index)| index.parse::<usize>().ok().map(|i| (name, i)))
        {
            Some((name, index)) => {
                if !name.is_empty() {
                    steps.push(Step::Key(name.to_string()));
                }
                steps.push(Step::Index(index));
            }
            None => steps.push(Step::Key(part.to_string())),
        }
    }
    if steps.len() > options.max_depth {
        return Err(too_deep(options));
    }
    Ok(steps)
}

fn too_deep(options: &DecodeOptions) -> DispatchError {
    DispatchError::bad_request(format!(
        "parameter name nests deeper than {} levels",
        options.max_depth
    ))
}

/// Rebuilds nested objects and lists from flat parameter names.
///
/// A later key that conflicts with an earlier one (`a=1` then `a.b=2`)
/// replaces it.
///
/// # Errors
///
/// Returns `400 Bad Request` if a key nests deeper than
/// [`DecodeOptions::max_depth`].
///
/// # Example
///
/// ```
/// use arbor_core::{DecodeOptions, Params};
/// use arbor_extract::variable_decode;
/// use serde_json::json;
///
/// let mut params = Params::new();
/// params.insert("user.name".into(), json!("ada"));
/// params.insert("tags-1".into(), json!("b"));
/// params.insert("tags-0".into(), json!("a"));
///
/// assert_eq!(
///     variable_decode(&params, &DecodeOptions::default()).unwrap(),
///     json!({"user": {"name": "ada"}, "tags": ["a", "b"]}),
/// );
/// ```
pub fn variable_decode(params: &Params, options: &DecodeOptions) -> DispatchResult<Value> {
    let mut root = Slot::Map(IndexMap::new());
    for (key, value) in params {
        root.insert(&steps(key, options)?, value.clone());
    }
    Ok(root.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_flat_keys_pass_through() {
        let input = params(&[("a", json!("1")), ("b", json!("2"))]);
        assert_eq!(
            variable_decode(&input, &DecodeOptions::default()).unwrap(),
            json!({"a": "1", "b": "2"})
        );
    }

    #[test]
    fn test_list_of_objects() {
        let input = params(&[
            ("people-0.name", json!("ada")),
            ("people-1.name", json!("alan")),
            ("people-0.born", json!("1815")),
        ]);
        assert_eq!(
            variable_decode(&input, &DecodeOptions::default()).unwrap(),
            json!({"people": [{"name": "ada", "born": "1815"}, {"name": "alan"}]})
        );
    }

    #[test]
    fn test_sparse_indices_collapse() {
        let input = params(&[("n-5", json!("x")), ("n-2", json!("y"))]);
        assert_eq!(
            variable_decode(&input, &DecodeOptions::default()).unwrap(),
            json!({"n": ["y", "x"]})
        );
    }

    #[test]
    fn test_non_numeric_suffix_is_a_plain_key() {
        let input = params(&[("first-name", json!("ada"))]);
        assert_eq!(
            variable_decode(&input, &DecodeOptions::default()).unwrap(),
            json!({"first-name": "ada"})
        );
    }

    #[test]
    fn test_custom_separators() {
        let options = DecodeOptions {
            dict_char: ':',
            list_char: '_',
            ..DecodeOptions::default()
        };
        let input = params(&[("a:b_0", json!(1))]);
        assert_eq!(variable_decode(&input, &options).unwrap(), json!({"a": {"b": [1]}}));
    }

    #[test]
    fn test_over_deep_key_is_bad_request() {
        let key = vec!["a"; 200_000].join(".");
        let input = params(&[(key.as_str(), json!("x"))]);
        let err = variable_decode(&input, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.status_code(), Some(http::StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_depth_limit_counts_list_indices() {
        let options = DecodeOptions {
            max_depth: 3,
            ..DecodeOptions::default()
        };
        let ok = params(&[("a.b.c", json!("x"))]);
        assert_eq!(variable_decode(&ok, &options).unwrap(), json!({"a": {"b": {"c": "x"}}}));

        let deep = params(&[("a.b-0.c", json!("x"))]);
        assert!(variable_decode(&deep, &options).is_err());
    }

    proptest! {
        #[test]
        fn prop_keys_without_separators_are_unchanged(
            entries in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9 ]{0,8}", 0..8)
        ) {
            let input: Params = entries
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            let decoded = variable_decode(&input, &DecodeOptions::default()).unwrap();
            let expected: Map<String, Value> = input.into_iter().collect();
            prop_assert_eq!(decoded, Value::Object(expected));
        }
    }
}
