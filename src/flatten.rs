//! Conversion between nested mappings and dotted key paths.
//!
//! `{ci: {debug: true}}` flattens to `(["ci.debug"], [true])`, and expanding
//! `{"ci.debug": true}` gives the nested form back.

use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;

/// Flatten a nested mapping into parallel lists of dotted keys and leaf values.
///
/// Recursion follows nested mappings only; any other value (sequence, scalar,
/// null) is a leaf. Non-string keys are rendered with their YAML spelling.
/// `prefix`, when non-empty, is prepended to every key.
pub fn flatten(input: &Mapping, prefix: &str) -> (Vec<String>, Vec<Value>) {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    flatten_into(input, prefix, &mut keys, &mut values);
    (keys, values)
}

fn flatten_into(input: &Mapping, prefix: &str, keys: &mut Vec<String>, values: &mut Vec<Value>) {
    for (key, value) in input {
        let path = dotted(prefix, &key_string(key));
        match value {
            Value::Mapping(nested) => flatten_into(nested, &path, keys, values),
            leaf => {
                keys.push(path);
                values.push(leaf.clone());
            }
        }
    }
}

/// Expand a mapping whose keys are dotted paths into nested mappings,
/// creating intermediate mappings as needed.
///
/// Fails with [`ConfigError::PathConflict`] when an intermediate segment
/// already holds a non-mapping value.
pub fn expand(flat: &Mapping) -> Result<Mapping, ConfigError> {
    let mut result = Mapping::new();
    for (key, value) in flat {
        let dotted_key = key_string(key);
        let segments: Vec<&str> = dotted_key.split('.').collect();
        let (leaf, parents) = segments
            .split_last()
            .expect("split always yields at least one segment");

        let mut current = &mut result;
        for segment in parents {
            let slot = current
                .entry(Value::String((*segment).to_string()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            current = match slot {
                Value::Mapping(next) => next,
                _ => return Err(ConfigError::PathConflict((*segment).to_string())),
            };
        }
        current.insert(Value::String((*leaf).to_string()), value.clone());
    }
    Ok(result)
}

fn dotted(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping(src: &str) -> Mapping {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn flat_mapping_with_prefix() {
        let (keys, values) = flatten(&mapping("key1: value1\nkey2:\n  key3: value2\n"), "prefix");
        assert_eq!(keys, ["prefix.key1", "prefix.key2.key3"]);
        assert_eq!(values, [Value::from("value1"), Value::from("value2")]);
    }

    #[test]
    fn no_prefix() {
        let (keys, _) = flatten(&mapping("crc: true\nci:\n  debug: true\n"), "");
        assert_eq!(keys, ["crc", "ci.debug"]);
    }

    #[test]
    fn sequences_are_leaves() {
        let (keys, values) = flatten(&mapping("list: [1, 2]\n"), "");
        assert_eq!(keys, ["list"]);
        assert!(values[0].is_sequence());
    }

    #[test]
    fn non_string_keys_are_stringified() {
        let (keys, _) = flatten(&mapping("1: a\ntrue:\n  2: b\n"), "");
        assert_eq!(keys, ["1", "true.2"]);
    }

    #[test]
    fn empty_mapping_flattens_to_nothing() {
        let (keys, values) = flatten(&Mapping::new(), "x");
        assert!(keys.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn expand_nests_dotted_keys() {
        let expanded = expand(&mapping("a.b.c: 1\na.d: two\ne: true\n")).unwrap();
        assert_eq!(expanded, mapping("a:\n  b:\n    c: 1\n  d: two\ne: true\n"));
    }

    #[test]
    fn expand_conflict() {
        let err = expand(&mapping("a: 1\na.b: 2\n")).unwrap_err();
        match err {
            ConfigError::PathConflict(key) => assert_eq!(key, "a"),
            other => panic!("Expected PathConflict, got: {other:?}"),
        }
    }

    #[test]
    fn expand_inverts_flatten() {
        let original = mapping(
            "namespace: tssc\nsettings:\n  crc: false\n  ci:\n    debug: true\n    tags: [a, b]\nproducts:\n  dh:\n    url: http://x\n",
        );
        let (keys, values) = flatten(&original, "");
        let flat: Mapping = keys.into_iter().map(Value::String).zip(values).collect();
        assert_eq!(expand(&flat).unwrap(), original);
    }
}
