use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming a schema file that is probed before the
/// built-in candidate locations.
pub const SCHEMA_ENV_VAR: &str = "CONFIG_TREE_SCHEMA";

pub const DEFAULT_REFERENCE_PREFIX: &str = "__PATH__:";
pub const DEFAULT_PATH_KEY_SUFFIX: &str = "_path";
pub const DEFAULT_DELIMITER: &str = "__";
pub const DEFAULT_LIST_PREFIX: &str = "list_";

const DEFAULT_SCHEMA_CANDIDATES: &[&str] = &[
    "/usr/local/share/config-tree/config.schema.json",
    "/etc/config-tree/config.schema.json",
    "build_release/config.schema.json",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// String values starting with this prefix are replaced by the document
    /// they point at.
    pub reference_prefix: String,
    /// String values under keys ending with this suffix become absolute paths.
    pub path_key_suffix: String,
}

impl ResolverOptions {
    pub fn validate(&self) -> Result<()> {
        if self.reference_prefix.is_empty() {
            return Err(Error::Config(
                "resolver.reference_prefix cannot be empty".to_owned(),
            ));
        }
        if self.path_key_suffix.is_empty() {
            return Err(Error::Config(
                "resolver.path_key_suffix cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_owned(),
            path_key_suffix: DEFAULT_PATH_KEY_SUFFIX.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSyntax {
    pub delimiter: String,
    pub list_prefix: String,
    /// Suffixes after `list_prefix` that mean "append a new slot".
    pub append_tokens: Vec<String>,
}

impl PathSyntax {
    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::Config("paths.delimiter cannot be empty".to_owned()));
        }
        if self.list_prefix.is_empty() {
            return Err(Error::Config(
                "paths.list_prefix cannot be empty".to_owned(),
            ));
        }
        if self.append_tokens.iter().any(|token| token.is_empty()) {
            return Err(Error::Config(
                "paths.append_tokens cannot contain empty tokens".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for PathSyntax {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_owned(),
            list_prefix: DEFAULT_LIST_PREFIX.to_owned(),
            append_tokens: vec!["00".to_owned(), "append".to_owned()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaLocations {
    pub candidates: Vec<PathBuf>,
}

impl Default for SchemaLocations {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_SCHEMA_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }
}

impl SchemaLocations {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Default candidates, preceded by `$CONFIG_TREE_SCHEMA` when it is set.
    pub fn from_env() -> Self {
        let mut locations = Self::default();
        if let Ok(value) = std::env::var(SCHEMA_ENV_VAR) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                locations.candidates.insert(0, PathBuf::from(trimmed));
            }
        }
        locations
    }

    pub fn first_existing(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.is_file())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub resolver: ResolverOptions,
    pub paths: PathSyntax,
    pub schema: SchemaLocations,
}

impl EngineSettings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!(
                "failed to read engine settings '{}': {err}",
                path.display()
            ))
        })?;

        let settings: Self = toml::from_str(&content).map_err(|err| Error::Parse {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()?;
        self.paths.validate()
    }
}
