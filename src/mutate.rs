//! Strict in-place updates of the document tree.
//!
//! Only existing keys are updated. Missing parents, missing keys and
//! non-scalar targets are errors; no node is ever created or removed.

use serde_yaml::Value;

use crate::error::ConfigError;
use crate::node::{Mapping, Node};
use crate::types::{KeyPath, ROOT_KEY};

const PRODUCTS_KEY: &str = "products";
const NAME_KEY: &str = "name";

/// Set the scalar at `path`, relative to the `tssc` mapping.
pub(crate) fn set_path(root: &mut Node, path: &KeyPath, value: &Value) -> Result<(), ConfigError> {
    let base = installer_root_mut(root)?;
    let dotted = path.to_string();
    set_in_mapping(base, path.segments(), &dotted, value)?;
    tracing::debug!(path = %dotted, "configuration key updated");
    Ok(())
}

/// Set each path to the value at the same position. Stops at the first
/// failure; earlier updates stay applied.
pub(crate) fn set_paths(root: &mut Node, paths: &[KeyPath], values: &[Value]) -> Result<(), ConfigError> {
    if paths.len() != values.len() {
        return Err(ConfigError::ArityMismatch {
            paths: paths.len(),
            values: values.len(),
        });
    }
    for (path, value) in paths.iter().zip(values) {
        set_path(root, path, value)?;
    }
    Ok(())
}

/// Set the scalar at `segments` inside the `products` entry named `product`.
pub(crate) fn set_product_path(
    root: &mut Node,
    product: &str,
    segments: &[String],
    value: &Value,
) -> Result<(), ConfigError> {
    let dotted = format!("{PRODUCTS_KEY}[{product}].{}", segments.join("."));
    if segments.is_empty() || segments.iter().any(String::is_empty) {
        return Err(ConfigError::InvalidKeyPath {
            path: dotted,
            reason: "empty path segment",
        });
    }
    let entry = product_mut(installer_root_mut(root)?, product)?;
    set_in_mapping(entry, segments, &dotted, value)?;
    tracing::debug!(path = %dotted, "product key updated");
    Ok(())
}

/// Look up the node at `path`, relative to the `tssc` mapping.
pub(crate) fn get_path<'a>(root: &'a Node, path: &KeyPath) -> Option<&'a Node> {
    let mut current = root.as_mapping()?.get(ROOT_KEY)?;
    for segment in path.segments() {
        current = current.as_mapping()?.get(segment)?;
    }
    Some(current)
}

fn installer_root_mut(root: &mut Node) -> Result<&mut Mapping, ConfigError> {
    root.as_mapping_mut()
        .and_then(|top| top.get_mut(ROOT_KEY))
        .and_then(Node::as_mapping_mut)
        .ok_or(ConfigError::MissingRootKey)
}

fn set_in_mapping(
    base: &mut Mapping,
    segments: &[String],
    path: &str,
    value: &Value,
) -> Result<(), ConfigError> {
    let Some((key, parents)) = segments.split_last() else {
        return Err(ConfigError::InvalidKeyPath {
            path: path.to_string(),
            reason: "empty path",
        });
    };

    let mut current = base;
    for segment in parents {
        current = current
            .get_mut(segment)
            .and_then(Node::as_mapping_mut)
            .ok_or_else(|| ConfigError::PathNotFound {
                path: path.to_string(),
                segment: segment.clone(),
            })?;
    }

    let in_flow = current.is_flow();
    let entry = current
        .entry_mut(key)
        .ok_or_else(|| ConfigError::KeyNotFound {
            key: key.clone(),
            path: path.to_string(),
        })?;
    entry
        .assign(value, in_flow)
        .map_err(|reason| ConfigError::InvalidValue {
            key: path.to_string(),
            reason,
        })
}

fn product_mut<'a>(base: &'a mut Mapping, name: &str) -> Result<&'a mut Mapping, ConfigError> {
    let not_found = || ConfigError::ProductNotFound(name.to_string());
    let products = base
        .get_mut(PRODUCTS_KEY)
        .and_then(Node::as_sequence_mut)
        .ok_or_else(not_found)?;
    let index = products
        .iter()
        .position(|item| has_name(item, name))
        .ok_or_else(not_found)?;
    products.items[index]
        .value
        .as_mapping_mut()
        .ok_or_else(not_found)
}

fn has_name(item: &Node, name: &str) -> bool {
    item.as_mapping()
        .and_then(|m| m.get(NAME_KEY))
        .and_then(Node::as_scalar)
        .is_some_and(|s| s.value() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::INSTALLER_CONFIG;
    use crate::parse::parse_document;
    use pretty_assertions::assert_eq;

    fn root(src: &str) -> Node {
        parse_document(src).unwrap().root
    }

    fn path(dotted: &str) -> KeyPath {
        KeyPath::parse(dotted).unwrap()
    }

    #[test]
    fn sets_nested_scalar_in_place() {
        let mut node = root(INSTALLER_CONFIG);
        set_path(&mut node, &path("tssc.settings.ci.debug"), &Value::Bool(true)).unwrap();
        let rendered = node.to_string();
        assert!(rendered.contains("    ci:\n      debug: true\n"));
        assert!(rendered.contains("    # Enables CodeReady Containers specific tweaks.\n"));
    }

    #[test]
    fn missing_parent_is_path_not_found() {
        let mut node = root(INSTALLER_CONFIG);
        match set_path(&mut node, &path("tssc.settings.nope.debug"), &Value::Bool(true)) {
            Err(ConfigError::PathNotFound { segment, .. }) => assert_eq!(segment, "nope"),
            other => panic!("Expected PathNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn scalar_parent_is_path_not_found() {
        let mut node = root(INSTALLER_CONFIG);
        assert!(matches!(
            set_path(&mut node, &path("tssc.namespace.inner"), &Value::from("x")),
            Err(ConfigError::PathNotFound { .. })
        ));
    }

    #[test]
    fn missing_leaf_is_key_not_found_and_creates_nothing() {
        let mut node = root(INSTALLER_CONFIG);
        let before = node.to_string();
        match set_path(&mut node, &path("tssc.settings.newkey"), &Value::from("v")) {
            Err(ConfigError::KeyNotFound { key, path }) => {
                assert_eq!(key, "newkey");
                assert_eq!(path, "settings.newkey");
            }
            other => panic!("Expected KeyNotFound, got: {other:?}"),
        }
        assert_eq!(node.to_string(), before);
    }

    #[test]
    fn mapping_target_is_invalid_value() {
        let mut node = root(INSTALLER_CONFIG);
        assert!(matches!(
            set_path(&mut node, &path("tssc.settings.ci"), &Value::Bool(true)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_root_key() {
        let mut node = root("other:\n  namespace: x\n");
        assert!(matches!(
            set_path(&mut node, &path("tssc.namespace"), &Value::from("y")),
            Err(ConfigError::MissingRootKey)
        ));
    }

    #[test]
    fn batch_arity_mismatch() {
        let mut node = root(INSTALLER_CONFIG);
        let err = set_paths(&mut node, &[path("tssc.namespace")], &[]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ArityMismatch {
                paths: 1,
                values: 0
            }
        ));
    }

    #[test]
    fn batch_keeps_steps_before_failure() {
        let mut node = root(INSTALLER_CONFIG);
        let paths = [path("tssc.namespace"), path("tssc.settings.missing"), path("tssc.settings.crc")];
        let values = [Value::from("changed"), Value::Bool(true), Value::Bool(true)];
        assert!(set_paths(&mut node, &paths, &values).is_err());
        let rendered = node.to_string();
        assert!(rendered.contains("  namespace: changed\n"));
        assert!(rendered.contains("    crc: false\n"));
    }

    #[test]
    fn sets_product_property_by_name() {
        let mut node = root(INSTALLER_CONFIG);
        let segments = ["properties".to_string(), "authProvider".to_string()];
        set_product_path(&mut node, "Developer Hub", &segments, &Value::from("gitlab")).unwrap();
        assert!(
            node.to_string()
                .contains("        authProvider: gitlab  # github, gitlab or oidc\n")
        );
    }

    #[test]
    fn unknown_product() {
        let mut node = root(INSTALLER_CONFIG);
        let segments = ["enabled".to_string()];
        match set_product_path(&mut node, "Quay", &segments, &Value::Bool(true)) {
            Err(ConfigError::ProductNotFound(name)) => assert_eq!(name, "Quay"),
            other => panic!("Expected ProductNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn get_walks_from_installer_root() {
        let node = root(INSTALLER_CONFIG);
        let crc = get_path(&node, &path("tssc.settings.crc")).unwrap();
        assert_eq!(crc.as_scalar().unwrap().value(), "false");
        assert!(get_path(&node, &path("tssc.settings.absent")).is_none());
        assert!(get_path(&node, &path("tssc.products")).unwrap().as_sequence().is_some());
    }

    #[test]
    fn updates_inside_flow_mapping() {
        let mut node = root("tssc:\n  namespace: x\n  settings: {crc: false, name: dev}\n");
        set_path(&mut node, &path("tssc.settings.crc"), &Value::Bool(true)).unwrap();
        set_path(&mut node, &path("tssc.settings.name"), &Value::from("a,b")).unwrap();
        assert_eq!(
            node.to_string(),
            "tssc:\n  namespace: x\n  settings: {crc: true, name: \"a,b\"}\n"
        );
    }

    #[test]
    fn empty_flow_mapping_has_no_keys() {
        let mut node = root("tssc:\n  namespace: x\n  settings: {}\n");
        match set_path(&mut node, &path("tssc.settings.crc"), &Value::Bool(true)) {
            Err(ConfigError::KeyNotFound { key, .. }) => assert_eq!(key, "crc"),
            other => panic!("Expected KeyNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn updates_below_anchored_mapping() {
        let src = "tssc:\n  namespace: x\n  settings: &base\n    crc: false\n";
        let mut node = root(src);
        set_path(&mut node, &path("tssc.settings.crc"), &Value::Bool(true)).unwrap();
        assert_eq!(
            node.to_string(),
            "tssc:\n  namespace: x\n  settings: &base\n    crc: true\n"
        );
    }

    #[test]
    fn numeric_value_stays_numeric() {
        let mut node = root("tssc:\n  namespace: x\n  settings:\n    replicas: 1\n");
        set_path(&mut node, &path("tssc.settings.replicas"), &Value::from("3")).unwrap();
        assert!(node.to_string().ends_with("    replicas: 3\n"));
    }
}
