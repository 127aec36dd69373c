use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config::merge::merge;
use crate::config::path::PathSpec;
use crate::config::resolve::ReferenceResolver;
use crate::config::schema::{default_provider, FileSchemaProvider, SchemaProvider};
use crate::config::settings::{EngineSettings, PathSyntax, SchemaLocations};
use crate::error::{Error, Result};
use crate::hash::{canonical_json, content_hash};

/// Base document a [`Configuration`] is built from.
#[derive(Clone)]
pub enum ConfigSource {
    Tree(Value),
    File(PathBuf),
    Configuration(Configuration),
}

impl From<Value> for ConfigSource {
    fn from(value: Value) -> Self {
        Self::Tree(value)
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<Configuration> for ConfigSource {
    fn from(config: Configuration) -> Self {
        Self::Configuration(config)
    }
}

impl From<&Configuration> for ConfigSource {
    fn from(config: &Configuration) -> Self {
        Self::Configuration(config.clone())
    }
}

/// Value written by an override. Files and reference-marker strings are
/// loaded, other configurations contribute their resolved tree.
#[derive(Clone)]
pub enum OverrideValue {
    Tree(Value),
    File(PathBuf),
    Configuration(Configuration),
}

impl From<Value> for OverrideValue {
    fn from(value: Value) -> Self {
        Self::Tree(value)
    }
}

impl From<&str> for OverrideValue {
    fn from(value: &str) -> Self {
        Self::Tree(Value::String(value.to_owned()))
    }
}

impl From<String> for OverrideValue {
    fn from(value: String) -> Self {
        Self::Tree(Value::String(value))
    }
}

impl From<bool> for OverrideValue {
    fn from(value: bool) -> Self {
        Self::Tree(Value::Bool(value))
    }
}

impl From<i64> for OverrideValue {
    fn from(value: i64) -> Self {
        Self::Tree(Value::from(value))
    }
}

impl From<f64> for OverrideValue {
    fn from(value: f64) -> Self {
        Self::Tree(Value::from(value))
    }
}

impl From<PathBuf> for OverrideValue {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for OverrideValue {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<Configuration> for OverrideValue {
    fn from(config: Configuration) -> Self {
        Self::Configuration(config)
    }
}

impl From<&Configuration> for OverrideValue {
    fn from(config: &Configuration) -> Self {
        Self::Configuration(config.clone())
    }
}

enum OverridePath {
    Raw(String),
    Spec(PathSpec),
}

pub struct ConfigurationBuilder {
    source: ConfigSource,
    overrides: Vec<(OverridePath, OverrideValue)>,
    resolver: ReferenceResolver,
    syntax: PathSyntax,
    schema: Option<Arc<dyn SchemaProvider>>,
    schema_locations: Option<SchemaLocations>,
}

impl ConfigurationBuilder {
    fn new(source: ConfigSource) -> Self {
        Self {
            source,
            overrides: Vec::new(),
            resolver: ReferenceResolver::default(),
            syntax: PathSyntax::default(),
            schema: None,
            schema_locations: None,
        }
    }

    /// Queues a write of `value` at the delimiter-joined `path`. Overrides
    /// apply in call order; the path is parsed during [`Self::build`].
    pub fn with_override(
        mut self,
        path: impl Into<String>,
        value: impl Into<OverrideValue>,
    ) -> Self {
        self.overrides
            .push((OverridePath::Raw(path.into()), value.into()));
        self
    }

    pub fn with_override_spec(mut self, path: PathSpec, value: impl Into<OverrideValue>) -> Self {
        self.overrides.push((OverridePath::Spec(path), value.into()));
        self
    }

    /// Uses the marker, suffix, path syntax and schema locations from
    /// `settings`. A provider passed to [`Self::schema`] takes precedence over
    /// the locations. The settings are validated by [`Self::build`].
    pub fn settings(mut self, settings: &EngineSettings) -> Self {
        self.resolver = ReferenceResolver::new(settings.resolver.clone());
        self.syntax = settings.paths.clone();
        self.schema_locations = Some(settings.schema.clone());
        self
    }

    pub fn schema(mut self, provider: Arc<dyn SchemaProvider>) -> Self {
        self.schema = Some(provider);
        self
    }

    pub fn build(self) -> Result<Configuration> {
        let Self {
            source,
            overrides,
            resolver,
            syntax,
            schema,
            schema_locations,
        } = self;
        resolver.options().validate()?;
        syntax.validate()?;
        let schema: Arc<dyn SchemaProvider> = match (schema, schema_locations) {
            (Some(provider), _) => provider,
            (None, Some(locations)) => Arc::new(FileSchemaProvider::new(locations)),
            (None, None) => default_provider(),
        };

        let mut tree = match source {
            ConfigSource::Tree(value) => {
                into_root_map(resolver.resolve(&value, Path::new(""))?, "in-memory tree")?
            }
            ConfigSource::File(path) => {
                if !path.is_file() {
                    return Err(Error::InvalidSource(format!(
                        "'{}' is not a readable file",
                        path.display()
                    )));
                }
                let label = path.display().to_string();
                into_root_map(resolver.resolve_document(&path)?, &label)?
            }
            ConfigSource::Configuration(config) => into_root_map(config.tree, "configuration")?,
        };

        for (path, value) in overrides {
            let spec = match path {
                OverridePath::Raw(raw) => PathSpec::parse_with(&raw, &syntax)?,
                OverridePath::Spec(spec) => spec,
            };
            let value = match value {
                OverrideValue::Tree(value) => resolver.resolve(&value, Path::new(""))?,
                OverrideValue::File(path) => resolver.resolve_document(&path)?,
                OverrideValue::Configuration(config) => config.tree,
            };
            tracing::debug!(
                path = %spec.display_with(&syntax),
                "applying configuration override"
            );
            spec.write(&mut tree, value)?;
        }

        Configuration::validated(Value::Object(tree), schema, resolver, syntax)
    }
}

fn into_root_map(tree: Value, origin: &str) -> Result<Map<String, Value>> {
    match tree {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidSource(format!(
            "{origin} must contain a JSON object at root, found {}",
            kind_name(&other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Resolved, validated and immutable configuration tree.
///
/// Equality and hashing use the content hash, so two configurations built
/// from differently ordered documents with the same content are equal.
#[derive(Clone)]
pub struct Configuration {
    tree: Value,
    hash: String,
    schema: Arc<dyn SchemaProvider>,
    resolver: ReferenceResolver,
    syntax: PathSyntax,
}

impl Configuration {
    pub fn builder(source: impl Into<ConfigSource>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(source.into())
    }

    pub fn from_tree(tree: Value) -> Result<Self> {
        Self::builder(tree).build()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::builder(path).build()
    }

    /// Builder seeded with this configuration, its schema provider, resolver
    /// options and path syntax.
    pub fn to_builder(&self) -> ConfigurationBuilder {
        let mut builder = Self::builder(self).schema(Arc::clone(&self.schema));
        builder.resolver = self.resolver.clone();
        builder.syntax = self.syntax.clone();
        builder
    }

    fn validated(
        tree: Value,
        schema: Arc<dyn SchemaProvider>,
        resolver: ReferenceResolver,
        syntax: PathSyntax,
    ) -> Result<Self> {
        schema.validate(&tree)?;
        let hash = content_hash(&tree);
        Ok(Self {
            tree,
            hash,
            schema,
            resolver,
            syntax,
        })
    }

    pub fn get(&self, key: &str) -> Result<&Value> {
        self.tree
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("configuration key '{key}'")))
    }

    pub fn lookup(&self, path: &PathSpec) -> Option<&Value> {
        self.tree.as_object().and_then(|root| path.lookup(root))
    }

    /// Direct assignment is not supported; build a new configuration with an
    /// override instead.
    pub fn try_set(&self, key: &str, _value: Value) -> Result<()> {
        Err(Error::ImmutableWriteRejected(key.to_owned()))
    }

    pub fn content_hash(&self) -> &str {
        &self.hash
    }

    /// New configuration with `other` deep-merged over this one. Both inputs
    /// are left unchanged; the result is validated with this configuration's
    /// schema provider.
    pub fn merge_with(&self, other: &Configuration) -> Result<Configuration> {
        tracing::debug!(
            base = %self.hash,
            overlay = %other.hash,
            "merging configurations"
        );
        Self::validated(
            merge(&self.tree, &other.tree),
            Arc::clone(&self.schema),
            self.resolver.clone(),
            self.syntax.clone(),
        )
    }

    pub fn serialize(&self) -> String {
        canonical_json(&self.tree)
    }

    /// Writes the canonical JSON text, replacing `path` atomically. The text
    /// is staged in a uniquely named sibling file that is removed on failure.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let parent = match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let mut staged = tempfile::NamedTempFile::new_in(parent)?;
        staged.write_all(self.serialize().as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    /// Deep copy the caller may mutate freely.
    pub fn to_plain_tree(&self) -> Value {
        self.tree.clone()
    }

    pub fn as_tree(&self) -> &Value {
        &self.tree
    }

    pub fn schema_provider(&self) -> &Arc<dyn SchemaProvider> {
        &self.schema
    }

    pub fn path_syntax(&self) -> &PathSyntax {
        &self.syntax
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Configuration {}

impl std::hash::Hash for Configuration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("hash", &self.hash)
            .field("config", &self.tree)
            .finish()
    }
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = serde_json::to_string_pretty(&self.tree).map_err(|_| std::fmt::Error)?;
        write!(f, "{rendered}")
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.tree.serialize(serializer)
    }
}
