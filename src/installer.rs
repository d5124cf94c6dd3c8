//! Typed view of the `tssc` section: installer namespace, settings and products.
//!
//! The view is decoded from the document tree and never edited directly.
//! Keys the types below do not know about are ignored during decode and
//! reported at debug level; they stay in the document untouched.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;
use crate::types::ROOT_KEY;

/// Free-form installer settings.
pub type Settings = Mapping;

/// Installer configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    /// Namespace where the installer's resources are deployed. Helm charts
    /// deployed by the installer usually target other namespaces.
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// One integration target managed by the installer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub properties: Mapping,
}

impl Spec {
    /// Decode the `tssc` section out of a whole-document value.
    pub fn from_document(document: Value) -> Result<Self, ConfigError> {
        let Value::Mapping(mut top) = document else {
            return Err(ConfigError::MissingRootKey);
        };
        let root = match top.remove(ROOT_KEY) {
            Some(root @ Value::Mapping(_)) => root,
            _ => return Err(ConfigError::MissingRootKey),
        };

        let mut ignored = Vec::new();
        let spec: Spec = serde_ignored::deserialize(root, |path| ignored.push(path.to_string()))
            .map_err(ConfigError::DecodeError)?;
        for key in &ignored {
            tracing::debug!(key = %key, "ignoring unknown configuration key");
        }
        Ok(spec)
    }

    /// Check required sections, then every product in order. The first failure
    /// is returned as is.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::MissingNamespace);
        }
        if self.settings.is_none() {
            return Err(ConfigError::MissingSettings);
        }
        for product in &self.products {
            product.validate()?;
        }
        Ok(())
    }

    pub fn get_product(&self, name: &str) -> Result<&Product, ConfigError> {
        self.products
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProductNotFound(name.into()))
    }

    /// Enabled products, in configuration order.
    pub fn enabled_products(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| p.enabled).collect()
    }
}

impl Product {
    /// A product needs a name, and a namespace once it is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidProduct {
                name: self.name.clone(),
                reason: "missing name".into(),
            });
        }
        if self.enabled && self.namespace().is_none() {
            return Err(ConfigError::InvalidProduct {
                name: self.name.clone(),
                reason: "enabled product requires a namespace".into(),
            });
        }
        Ok(())
    }

    /// Target namespace, if one is configured and non-empty.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{INSTALLER_CONFIG, MINIMAL_CONFIG};

    fn spec(src: &str) -> Spec {
        Spec::from_document(serde_yaml::from_str(src).unwrap()).unwrap()
    }

    #[test]
    fn decodes_installer_config() {
        let spec = spec(INSTALLER_CONFIG);
        assert_eq!(spec.namespace, "tssc");
        assert_eq!(spec.products.len(), 4);
        let settings = spec.settings.as_ref().unwrap();
        assert_eq!(settings.get("crc"), Some(&Value::Bool(false)));
        let dh = spec.get_product("Developer Hub").unwrap();
        assert_eq!(dh.namespace(), Some("tssc-dh"));
        assert_eq!(
            dh.property("authProvider"),
            Some(&Value::String("github".into()))
        );
    }

    #[test]
    fn missing_root_key() {
        let err = Spec::from_document(serde_yaml::from_str("other: 1").unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRootKey));
        let err = Spec::from_document(serde_yaml::from_str("tssc: scalar").unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRootKey));
        let err = Spec::from_document(Value::Null).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRootKey));
    }

    #[test]
    fn shape_mismatch_is_decode_error() {
        let doc = serde_yaml::from_str("tssc:\n  products: not-a-list\n").unwrap();
        let err = Spec::from_document(doc).unwrap_err();
        assert!(matches!(err, ConfigError::DecodeError(_)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let spec = spec("tssc:\n  namespace: x\n  settings: {}\n  extra: 1\n  products:\n    - name: A\n      flavour: red\n");
        assert_eq!(spec.namespace, "x");
        assert_eq!(spec.products[0].name, "A");
    }

    #[test]
    fn validate_checks_namespace_before_settings() {
        let spec = spec("tssc:\n  namespace: ''\n");
        assert!(matches!(spec.validate(), Err(ConfigError::MissingNamespace)));
    }

    #[test]
    fn validate_requires_settings() {
        let spec = spec("tssc:\n  namespace: x\n  settings:\n");
        assert!(matches!(spec.validate(), Err(ConfigError::MissingSettings)));
    }

    #[test]
    fn validate_stops_at_first_invalid_product() {
        let spec = spec(
            "tssc:\n  namespace: x\n  settings: {}\n  products:\n    - name: First\n      enabled: true\n    - name: ''\n",
        );
        match spec.validate() {
            Err(ConfigError::InvalidProduct { name, .. }) => assert_eq!(name, "First"),
            other => panic!("Expected InvalidProduct, got: {other:?}"),
        }
    }

    #[test]
    fn get_product_not_found() {
        let spec = spec(INSTALLER_CONFIG);
        match spec.get_product("product1") {
            Err(ConfigError::ProductNotFound(name)) => assert_eq!(name, "product1"),
            other => panic!("Expected ProductNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn enabled_products_keep_order() {
        let spec = spec(MINIMAL_CONFIG);
        let names: Vec<&str> = spec
            .enabled_products()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["B", "C"]);
    }

    #[test]
    fn enabled_products_of_empty_list() {
        assert!(Spec::default().enabled_products().is_empty());
    }
}
