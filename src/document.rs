//! The structure-preserving configuration document.

use std::fmt;

use serde_yaml::Value;

use crate::error::ConfigError;
use crate::installer::Spec;
use crate::mutate;
use crate::node::Node;
use crate::parse::parse_document;
use crate::types::KeyPath;

/// A parsed YAML configuration document.
///
/// Rendering an unmodified document gives back its source text byte for byte.
/// Updates go through [`Document::set`] and friends, which only touch the
/// lexical value of existing scalars.
///
/// A `Document` holds no locks. Callers sharing one between threads must
/// serialize updates and rendering themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    prologue: String,
    root: Node,
    epilogue: String,
}

impl Document {
    /// Parse a configuration payload.
    ///
    /// The payload must hold a single YAML document. A stream with a second
    /// document after a `---` separator is a [`ConfigError::ParseError`].
    pub fn parse(payload: &[u8]) -> Result<Self, ConfigError> {
        if payload.is_empty() {
            return Err(ConfigError::EmptyPayload);
        }
        let text = std::str::from_utf8(payload).map_err(|e| ConfigError::ParseError {
            line: line_of(payload, e.valid_up_to()),
            reason: format!("invalid UTF-8: {e}"),
        })?;
        serde_yaml::from_str::<Value>(text).map_err(|e| ConfigError::from_yaml(&e))?;

        let parsed = parse_document(text)?;
        tracing::trace!(bytes = payload.len(), "configuration document parsed");
        Ok(Document {
            prologue: parsed.prologue,
            root: parsed.root,
            epilogue: parsed.epilogue,
        })
    }

    /// Decode the `tssc` section into its typed form.
    pub fn decode(&self) -> Result<Spec, ConfigError> {
        let value: Value =
            serde_yaml::from_str(&self.to_string()).map_err(|e| ConfigError::from_yaml(&e))?;
        Spec::from_document(value)
    }

    /// Render the document, with a leading `---` marker when the source had none.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        if self.root.is_null() {
            return Err(ConfigError::EmptyPayload);
        }
        let rendered = self.to_string();
        if has_start_marker(&self.prologue) {
            Ok(rendered)
        } else {
            Ok(format!("---\n{rendered}"))
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The node at `path` below the `tssc` mapping.
    pub fn get(&self, path: &KeyPath) -> Option<&Node> {
        mutate::get_path(&self.root, path)
    }

    /// Overwrite the scalar at `path`. The key must already exist.
    pub fn set(&mut self, path: &KeyPath, value: &Value) -> Result<(), ConfigError> {
        mutate::set_path(&mut self.root, path, value)
    }

    /// Apply `values[i]` to `paths[i]` in order.
    ///
    /// Not transactional: when a step fails, the steps before it stay applied.
    pub fn set_many(&mut self, paths: &[KeyPath], values: &[Value]) -> Result<(), ConfigError> {
        mutate::set_paths(&mut self.root, paths, values)
    }

    /// Overwrite a scalar inside the product entry whose `name` is `product`.
    pub fn set_in_product(
        &mut self,
        product: &str,
        segments: &[String],
        value: &Value,
    ) -> Result<(), ConfigError> {
        mutate::set_product_path(&mut self.root, product, segments, value)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prologue, self.root, self.epilogue)
    }
}

fn has_start_marker(prologue: &str) -> bool {
    prologue.lines().any(|line| {
        line.strip_prefix("---")
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
    })
}

fn line_of(payload: &[u8], offset: usize) -> usize {
    payload[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}
