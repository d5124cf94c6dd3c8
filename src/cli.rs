//! Clap adapter for the installer configuration.
//!
//! Compiled only when the `clap` Cargo feature is enabled (on by default).
//! [`ConfigArgs`] adds `--config <PATH>` and repeated `--set KEY=VALUE` flags
//! to any clap derive struct. [`ConfigArgs::load`] turns them into a loaded,
//! overridden and validated [`Config`].
//!
//! Hosts using another CLI parser can call
//! [`parse_overrides`](crate::parse_overrides) and
//! [`Config::apply_overrides`] directly.

use std::path::PathBuf;

use clap::Args;

use crate::config::Config;
use crate::error::ConfigError;
use crate::overrides::parse_overrides;
use crate::source::ByteSource;
use crate::types::OverrideTree;

/// Clap-derived flags selecting and overriding the installer configuration.
///
/// Flatten it into your app's clap derive:
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     config: ConfigArgs,
/// }
/// ```
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Configuration file to load instead of the installer default.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Override a setting (`crc=true`) or a product key
    /// (`Product[Developer Hub].properties.catalogURL=https://...`).
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    pub set: Vec<String>,
}

impl ConfigArgs {
    /// The override tree for the `--set` flags, or `None` when none were given.
    pub fn overrides(&self) -> Result<Option<OverrideTree>, ConfigError> {
        if self.set.is_empty() {
            return Ok(None);
        }
        parse_overrides(&self.set).map(Some)
    }

    /// Load the `--config` file, or the default configuration from `source`,
    /// then apply `--set` overrides and validate the result.
    pub fn load<S>(&self, source: &S) -> Result<Config, ConfigError>
    where
        S: ByteSource + ?Sized,
    {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default_from(source)?,
        };
        if let Some(tree) = self.overrides()? {
            config.apply_overrides(&tree)?;
            config.validate()?;
        }
        Ok(config)
    }
}
