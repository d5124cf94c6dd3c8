//! Installer configuration for the Trusted Software Supply Chain (`tssc`) CLI.
//!
//! The installer is driven by one YAML document. Its top-level `tssc` mapping
//! names the installer namespace, a free-form `settings` mapping and the list
//! of `products` to deploy. This crate loads that document, answers typed
//! queries against it, applies updates in place and writes it back without
//! disturbing anything the update did not touch.
//!
//! ```ignore
//! let mut config = Config::default_from(&DirSource::cwd()?)?;
//! for product in config.enabled_products() {
//!     println!("{} -> {}", product.name, product.namespace().unwrap_or("-"));
//! }
//! config.set("tssc.settings.crc", true)?;
//! std::fs::write("config.yaml", config.to_yaml()?)?;
//! ```
//!
//! # Two views of one document
//!
//! A [`Config`] holds the configuration twice:
//!
//! - A [`Document`]: a structure-preserving YAML tree. Comments, blank lines,
//!   quoting and indentation are kept as they were written, so rendering an
//!   unmodified document reproduces its source byte for byte.
//! - A [`Spec`]: the typed projection of the `tssc` mapping, with
//!   [`Product`] entries. Unknown keys are skipped by the projection (and
//!   logged at debug level) but stay in the document.
//!
//! Reads go through the `Spec`. Writes go through the document, and the
//! `Spec` is decoded again after every write.
//!
//! # Strict updates
//!
//! [`Config::set`] only updates keys that already exist. Paths are dotted,
//! have at least two segments and are relative to the `tssc` mapping; a
//! leading `tssc.` is stripped.
//!
//! ```text
//! tssc.settings.crc        ok, updates the existing scalar
//! settings.ci.debug        ok, same root without the prefix
//! namespace                InvalidKeyPath, write tssc.namespace
//! tssc.settings.newkey     KeyNotFound, nothing is created
//! tssc.nope.crc            PathNotFound, "nope" is not a mapping
//! tssc.settings            InvalidValue when given a scalar
//! ```
//!
//! An updated scalar keeps its type: `replicas: 1` set to `"3"` is written as
//! `replicas: 3`, while a string value set to `true` is quoted. Keys inside
//! flow collections (`flags: {crc: false}`) and below anchored mappings are
//! updated the same way as block keys.
//!
//! Passing a mapping to `set` flattens it into dotted leaves and updates each
//! one in order. Batch updates stop at the first failure and keep what was
//! applied before it.
//!
//! # Overrides
//!
//! [`parse_overrides`] turns `--set key=value` tokens into an override tree:
//!
//! ```text
//! --set crc=true                                  {setting: {crc: true}}
//! --set ci.debug=false                            {setting: {"ci.debug": false}}
//! --set Product[Developer Hub].enabled=false      {"Developer Hub": {enabled: false}}
//! ```
//!
//! [`Config::apply_overrides`] applies such a tree: `setting` entries update
//! keys below `settings`, product entries update the product with that name.
//!
//! # Loading
//!
//! Documents come from bytes ([`Config::from_bytes`]), a file
//! ([`Config::from_file`]) or any [`ByteSource`]. The installer's default
//! document lives at [`DEFAULT_CONFIG_PATH`] inside a source tree, which is
//! what [`Config::default_from`] reads. For [clap](https://docs.rs/clap)
//! users, the `clap` Cargo feature (on by default) adds [`ConfigArgs`] with
//! `--config` and `--set` flags.
//!
//! # Concurrency
//!
//! Nothing here is synchronized. Share a `Config` between threads behind a
//! `Mutex` and hold the lock across each update and render.
//!
//! # Logging
//!
//! Loading, updates and override handling emit [`tracing`] events at debug
//! and trace level. The crate never installs a subscriber.

pub mod error;
pub mod types;

mod config;
mod document;
mod flatten;
mod installer;
pub(crate) mod merge;
mod mutate;
mod node;
mod overrides;
mod parse;
mod source;

#[cfg(feature = "clap")]
mod cli;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::ConfigArgs;
pub use config::Config;
pub use document::Document;
pub use error::ConfigError;
pub use flatten::{expand, flatten};
pub use installer::{Product, Settings, Spec};
pub use merge::deep_merge;
pub use node::{Mapping, Node, Scalar, ScalarStyle, Sequence};
pub use overrides::{coerce_bool, parse_overrides};
pub use source::{ByteSource, DEFAULT_CONFIG_PATH, DirSource, MemorySource};
pub use types::{KeyPath, OverrideTree, ROOT_KEY, SETTING_KEY};
