//! The configuration facade: a [`Document`] plus its decoded [`Spec`].

use std::fmt;
use std::path::Path;

use serde_yaml::Value;

use crate::document::Document;
use crate::error::ConfigError;
use crate::flatten::flatten;
use crate::installer::{Product, Settings, Spec};
use crate::node::Node;
use crate::source::{ByteSource, DEFAULT_CONFIG_PATH};
use crate::types::{KeyPath, OverrideTree, ROOT_KEY, SETTING_KEY};

const SETTINGS_KEY: &str = "settings";

/// Installer configuration, loaded from a YAML document.
///
/// Reads go through the typed [`Spec`]; writes go through the document and
/// keep every comment and formatting detail of the source. After each write
/// the `Spec` is decoded again from the updated document, so both views
/// agree. When that decode fails, the `Spec` keeps the last state that decoded.
///
/// `Config` is not synchronized. A host sharing one instance between threads
/// must serialize `set`, `apply_overrides` and `to_yaml` calls itself, for
/// example behind a `Mutex<Config>`.
#[derive(Debug, Clone)]
pub struct Config {
    document: Document,
    spec: Spec,
}

impl Config {
    /// Parse, decode and validate a configuration payload.
    pub fn from_bytes(payload: &[u8]) -> Result<Self, ConfigError> {
        let document = Document::parse(payload)?;
        let spec = document.decode()?;
        spec.validate()?;
        tracing::debug!(
            namespace = %spec.namespace,
            products = spec.products.len(),
            "installer configuration loaded"
        );
        Ok(Config { document, spec })
    }

    /// Load the file at `path` from `source`.
    pub fn from_source<S>(source: &S, path: impl AsRef<Path>) -> Result<Self, ConfigError>
    where
        S: ByteSource + ?Sized,
    {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading installer configuration");
        Self::from_bytes(&source.read(path)?)
    }

    /// Load the installer's default configuration ([`DEFAULT_CONFIG_PATH`]) from `source`.
    pub fn default_from<S>(source: &S) -> Result<Self, ConfigError>
    where
        S: ByteSource + ?Sized,
    {
        Self::from_source(source, DEFAULT_CONFIG_PATH)
    }

    /// Load a configuration file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let payload = std::fs::read(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_bytes(&payload)
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Installer namespace.
    pub fn namespace(&self) -> &str {
        &self.spec.namespace
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.spec.settings.as_ref()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spec.validate()
    }

    pub fn get_product(&self, name: &str) -> Result<&Product, ConfigError> {
        self.spec.get_product(name)
    }

    pub fn enabled_products(&self) -> Vec<&Product> {
        self.spec.enabled_products()
    }

    /// Namespace of the named product. Fails when the product has none.
    pub fn product_namespace(&self, name: &str) -> Result<&str, ConfigError> {
        let product = self.get_product(name)?;
        product.namespace().ok_or_else(|| ConfigError::InvalidProduct {
            name: name.to_string(),
            reason: "namespace is not set".into(),
        })
    }

    /// The document node at a dotted key, such as `"tssc.settings.crc"`.
    pub fn get(&self, key: &str) -> Result<Option<&Node>, ConfigError> {
        Ok(self.document.get(&KeyPath::parse(key)?))
    }

    /// Update an existing key.
    ///
    /// A mapping value is flattened below `key` and applied as a batch, one
    /// existing leaf at a time (see [`Config::set_many`]). A mapping without
    /// leaves is rejected with [`ConfigError::InvalidValue`]. Any other value
    /// replaces the scalar at `key`.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let path = KeyPath::parse(key)?;
        let outcome = match value.into() {
            Value::Mapping(map) => {
                let (keys, values) = flatten(&map, &format!("{ROOT_KEY}.{path}"));
                if keys.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: "empty mapping has no keys to set".into(),
                    });
                }
                parse_paths(&keys).and_then(|paths| self.document.set_many(&paths, &values))
            }
            value => self.document.set(&path, &value),
        };
        self.refresh(outcome)
    }

    /// Set `keys[i]` to `values[i]`, in order.
    ///
    /// Not transactional: when a step fails, the steps before it stay applied
    /// and [`Config::spec`] reflects them.
    pub fn set_many<S: AsRef<str>>(&mut self, keys: &[S], values: &[Value]) -> Result<(), ConfigError> {
        if keys.len() != values.len() {
            return Err(ConfigError::ArityMismatch {
                paths: keys.len(),
                values: values.len(),
            });
        }
        let paths = parse_paths(keys)?;
        tracing::debug!(count = paths.len(), "applying batch update");
        let outcome = self.document.set_many(&paths, values);
        self.refresh(outcome)
    }

    /// Apply an override tree from [`parse_overrides`](crate::parse_overrides).
    ///
    /// The `setting` subtree updates keys below `settings`. Every other
    /// top-level key names a product whose entry is updated. As with
    /// [`Config::set`], only existing keys can be updated, and application
    /// stops at the first failure.
    pub fn apply_overrides(&mut self, tree: &OverrideTree) -> Result<(), ConfigError> {
        let outcome = self.apply_tree(tree);
        self.refresh(outcome)
    }

    fn apply_tree(&mut self, tree: &OverrideTree) -> Result<(), ConfigError> {
        for (key, subtree) in tree {
            let Some(name) = key.as_str() else {
                return Err(ConfigError::InvalidValue {
                    key: format!("{key:?}"),
                    reason: "override keys must be strings".into(),
                });
            };
            let Value::Mapping(subtree) = subtree else {
                return Err(ConfigError::InvalidValue {
                    key: name.to_string(),
                    reason: "override value must be a mapping".into(),
                });
            };

            if name == SETTING_KEY {
                let (keys, values) = flatten(subtree, SETTINGS_KEY);
                tracing::debug!(count = keys.len(), "applying setting overrides");
                let paths = parse_paths(&keys)?;
                self.document.set_many(&paths, &values)?;
            } else {
                let (keys, values) = flatten(subtree, "");
                tracing::debug!(product = name, count = keys.len(), "applying product overrides");
                for (key, value) in keys.iter().zip(&values) {
                    let segments: Vec<String> = key.split('.').map(str::to_string).collect();
                    self.document.set_in_product(name, &segments, value)?;
                }
            }
        }
        Ok(())
    }

    /// Render the document as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        self.document.to_yaml()
    }

    /// Decode the `Spec` again after a write, whatever the write's outcome.
    fn refresh(&mut self, outcome: Result<(), ConfigError>) -> Result<(), ConfigError> {
        match self.document.decode() {
            Ok(spec) => self.spec = spec,
            Err(err) => {
                tracing::debug!(error = %err, "updated document no longer decodes");
                outcome?;
                return Err(err);
            }
        }
        outcome
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document.to_yaml() {
            Ok(yaml) => f.write_str(&yaml),
            Err(_) => Ok(()),
        }
    }
}

fn parse_paths<S: AsRef<str>>(keys: &[S]) -> Result<Vec<KeyPath>, ConfigError> {
    keys.iter().map(|k| KeyPath::parse(k.as_ref())).collect()
}
