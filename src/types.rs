use std::fmt;

use crate::error::ConfigError;

/// Top-level key holding the installer configuration.
pub const ROOT_KEY: &str = "tssc";

/// Override tree key collecting every non-product `--set` entry.
pub const SETTING_KEY: &str = "setting";

/// Nested mapping produced by [`parse_overrides`](crate::parse_overrides), keyed
/// by [`SETTING_KEY`] or by product name.
pub type OverrideTree = serde_yaml::Mapping;

/// A location in the configuration document, relative to the `tssc` root.
///
/// A dotted key needs at least two segments. A leading `tssc` segment is then
/// stripped, so `tssc.namespace` and `settings.crc` are valid while
/// `namespace` and `tssc` are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Parse a dotted key such as `"tssc.settings.crc"`.
    pub fn parse(dotted: &str) -> Result<Self, ConfigError> {
        Self::from_segments(dotted.split('.'))
    }

    pub fn from_segments<I, S>(segments: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let dotted = segments.join(".");
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::InvalidKeyPath {
                path: dotted,
                reason: "empty path segment",
            });
        }
        if segments.len() < 2 {
            return Err(ConfigError::InvalidKeyPath {
                path: dotted,
                reason: "key path needs at least two segments",
            });
        }
        if segments[0] == ROOT_KEY {
            segments.remove(0);
        }
        Ok(KeyPath(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Split into the parent segments and the final key.
    pub fn split_last(&self) -> (&[String], &str) {
        let (last, parents) = self.0.split_last().expect("key path is never empty");
        (parents, last)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
