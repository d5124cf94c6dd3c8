//! Parse `--set key=value` tokens into a nested override tree.
//!
//! Two key grammars are accepted:
//!
//! - `crc=true`, `ci.debug=false`: installer settings, collected under the
//!   `setting` key as `{setting: {"ci.debug": false}}`.
//! - `Product[Developer Hub].properties.catalogURL=https://...`: a product
//!   override, expanded into `{"Developer Hub": {properties: {catalogURL: ...}}}`.
//!
//! A key is a product override when it contains "product" in any case. Values
//! spelled `true` or `false` (any case) become booleans; everything else stays
//! a string. Per-token trees are deep-merged, so the last token wins on a
//! colliding leaf.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;
use crate::flatten::expand;
use crate::merge::deep_merge;
use crate::types::{OverrideTree, SETTING_KEY};

static PRODUCT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)product").expect("product pattern is valid"));
static BRACKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("bracket pattern is valid"));

/// Parse `key=value` tokens into one merged [`OverrideTree`].
pub fn parse_overrides<S: AsRef<str>>(tokens: &[S]) -> Result<OverrideTree, ConfigError> {
    if tokens.is_empty() {
        return Err(ConfigError::NoOverrides);
    }

    let mut tree = OverrideTree::new();
    for token in tokens {
        let token = token.as_ref();
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidSetFormat(token.to_string()))?;
        let parsed = parse_key(key, coerce_bool(value))?;
        tracing::trace!(key, "parsed --set override");
        tree = deep_merge(tree, parsed);
    }
    Ok(tree)
}

/// `"true"`/`"false"` in any case become booleans; other values stay strings.
pub fn coerce_bool(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if value.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else {
        Value::String(value.to_string())
    }
}

fn parse_key(key: &str, value: Value) -> Result<Mapping, ConfigError> {
    if PRODUCT_PATTERN.is_match(key) {
        return parse_product_key(key, value);
    }
    let mut setting = Mapping::new();
    setting.insert(Value::String(key.to_string()), value);
    Ok(single(SETTING_KEY, Value::Mapping(setting)))
}

fn parse_product_key(key: &str, value: Value) -> Result<Mapping, ConfigError> {
    let (selector, property_path) = key
        .split_once('.')
        .ok_or_else(|| ConfigError::InvalidProductKeyFormat(key.to_string()))?;
    let name = product_name(selector).ok_or_else(|| ConfigError::MissingProductName(key.to_string()))?;

    let mut flat = Mapping::new();
    flat.insert(Value::String(property_path.to_string()), value);
    let expanded = expand(&flat)?;
    Ok(single(name, Value::Mapping(expanded)))
}

/// Product name from the first `[...]` pair in the selector.
fn product_name(selector: &str) -> Option<&str> {
    BRACKET_PATTERN
        .captures(selector)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn single(key: &str, value: Value) -> Mapping {
    let mut map = Mapping::new();
    map.insert(Value::String(key.to_string()), value);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping(src: &str) -> Mapping {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn plain_setting() {
        let tree = parse_overrides(&["crc=true"]).unwrap();
        assert_eq!(tree, mapping("setting:\n  crc: true\n"));
    }

    #[test]
    fn dotted_setting_keeps_key_flat() {
        let tree = parse_overrides(&["ci.debug=yes"]).unwrap();
        assert_eq!(tree["setting"]["ci.debug"], Value::from("yes"));
    }

    #[test]
    fn last_token_wins() {
        let tree = parse_overrides(&["a.b=1", "a.b=2"]).unwrap();
        assert_eq!(tree["setting"]["a.b"], Value::from("2"));
    }

    #[test]
    fn repeated_key_keeps_first_position() {
        let tree = parse_overrides(&["a=1", "b=2", "a=3"]).unwrap();
        let setting = tree["setting"].as_mapping().unwrap();
        let keys: Vec<&str> = setting.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(setting["a"], Value::from("3"));
    }

    #[test]
    fn boolean_coercion() {
        let tree = parse_overrides(&["flag=true", "upper=TRUE", "off=False", "word=yes"]).unwrap();
        let setting = &tree["setting"];
        assert_eq!(setting["flag"], Value::Bool(true));
        assert_eq!(setting["upper"], Value::Bool(true));
        assert_eq!(setting["off"], Value::Bool(false));
        assert_eq!(setting["word"], Value::from("yes"));
    }

    #[test]
    fn value_keeps_later_equals_signs() {
        let tree = parse_overrides(&["token=a=b"]).unwrap();
        assert_eq!(tree["setting"]["token"], Value::from("a=b"));
    }

    #[test]
    fn product_key() {
        let tree = parse_overrides(&["Product[Foo].url=http://x"]).unwrap();
        assert_eq!(tree, mapping("Foo:\n  url: http://x\n"));
    }

    #[test]
    fn product_key_nested_path() {
        let tree = parse_overrides(&[
            "product[Developer Hub].properties.catalogURL=https://example.com/all.yaml",
            "PRODUCT[Developer Hub].enabled=false",
        ])
        .unwrap();
        assert_eq!(
            tree,
            mapping(
                "Developer Hub:\n  properties:\n    catalogURL: https://example.com/all.yaml\n  enabled: false\n"
            )
        );
    }

    #[test]
    fn product_and_setting_tokens_merge() {
        let tree = parse_overrides(&[
            "crc=true",
            "Product[A].namespace=a",
            "Product[B].namespace=b",
            "Product[A].namespace=a2",
        ])
        .unwrap();
        assert_eq!(tree["setting"]["crc"], Value::Bool(true));
        assert_eq!(tree["A"]["namespace"], Value::from("a2"));
        assert_eq!(tree["B"]["namespace"], Value::from("b"));
    }

    #[test]
    fn missing_equals() {
        match parse_overrides(&["crc"]) {
            Err(ConfigError::InvalidSetFormat(token)) => assert_eq!(token, "crc"),
            other => panic!("Expected InvalidSetFormat, got: {other:?}"),
        }
    }

    #[test]
    fn product_key_without_dot() {
        assert!(matches!(
            parse_overrides(&["Product[Foo]url=x"]),
            Err(ConfigError::InvalidProductKeyFormat(_))
        ));
    }

    #[test]
    fn product_key_without_brackets() {
        assert!(matches!(
            parse_overrides(&["ProductFoo.url=x"]),
            Err(ConfigError::MissingProductName(_))
        ));
    }

    #[test]
    fn empty_brackets_are_missing_name() {
        assert!(matches!(
            parse_overrides(&["Product[].url=x"]),
            Err(ConfigError::MissingProductName(_))
        ));
    }

    #[test]
    fn no_tokens() {
        let tokens: [&str; 0] = [];
        assert!(matches!(
            parse_overrides(&tokens),
            Err(ConfigError::NoOverrides)
        ));
    }

    #[test]
    fn failing_token_aborts_whole_parse() {
        assert!(parse_overrides(&["crc=true", "broken"]).is_err());
    }
}
