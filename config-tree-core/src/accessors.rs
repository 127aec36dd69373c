use std::collections::BTreeMap;

use crate::config::path::PathSpec;
use crate::configuration::Configuration;
use crate::error::{Error, Result};

/// Explicit list of named boolean switches and the tree location each one
/// controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagMap {
    entries: BTreeMap<String, PathSpec>,
}

impl FlagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, path: PathSpec) -> Self {
        self.entries.insert(name.into(), path);
        self
    }

    /// Builds a map from `(name, delimiter-joined path)` pairs.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let mut flags = Self::new();
        for (name, raw_path) in entries {
            flags.entries.insert(name.to_owned(), PathSpec::parse(raw_path)?);
        }
        Ok(flags)
    }

    pub fn path(&self, name: &str) -> Result<&PathSpec> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("configuration has no flag '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Configuration {
    /// New configuration with the flag's location set to `enabled`.
    pub fn with_flag(&self, flags: &FlagMap, name: &str, enabled: bool) -> Result<Configuration> {
        let path = flags.path(name)?.clone();
        self.to_builder().with_override_spec(path, enabled).build()
    }

    pub fn enable(&self, flags: &FlagMap, name: &str) -> Result<Configuration> {
        self.with_flag(flags, name, true)
    }

    pub fn disable(&self, flags: &FlagMap, name: &str) -> Result<Configuration> {
        self.with_flag(flags, name, false)
    }

    /// Current value of the flag; `None` when unset or not a boolean.
    pub fn flag(&self, flags: &FlagMap, name: &str) -> Result<Option<bool>> {
        let path = flags.path(name)?;
        Ok(self.lookup(path).and_then(serde_json::Value::as_bool))
    }
}
