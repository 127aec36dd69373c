//! Configuration-tree engine: builds nested JSON configuration documents from
//! files or in-memory trees, expands cross-file references, applies
//! path-keyed overrides, validates against a JSON schema and composes
//! configurations with a deterministic deep merge.

pub mod accessors;
pub mod config;
pub mod configuration;
pub mod error;
pub mod hash;
pub mod logging;
pub mod sweep;

pub use accessors::FlagMap;
pub use config::{merge, PathSpec, ReferenceResolver, SchemaProvider};
pub use configuration::{ConfigSource, Configuration, ConfigurationBuilder, OverrideValue};
pub use error::{Error, Result};
pub use hash::{content_hash, group_digest};
pub use sweep::{expand_grid, Hyperparameter};
