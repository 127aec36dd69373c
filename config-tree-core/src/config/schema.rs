use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::config::loader::load_document;
use crate::config::settings::SchemaLocations;
use crate::error::{Error, Result};

const ROOT_LOCATION: &str = "<root>";

/// Source of the schema every configuration is validated against.
pub trait SchemaProvider: Send + Sync {
    fn schema(&self) -> Result<&JSONSchema>;

    fn validate(&self, tree: &Value) -> Result<()> {
        validate_against(self.schema()?, tree)
    }
}

pub fn validate_against(schema: &JSONSchema, tree: &Value) -> Result<()> {
    let Err(errors) = schema.validate(tree) else {
        return Ok(());
    };

    let violations = errors
        .map(|err| (describe_location(&err.instance_path.to_string()), err.to_string()))
        .collect::<Vec<_>>();
    let location = violations
        .first()
        .map(|(location, _)| location.clone())
        .unwrap_or_else(|| ROOT_LOCATION.to_owned());
    let message = violations
        .iter()
        .map(|(location, message)| format!("{location}: {message}"))
        .collect::<Vec<_>>()
        .join("; ");

    Err(Error::SchemaValidation { location, message })
}

fn describe_location(pointer: &str) -> String {
    if pointer.is_empty() {
        ROOT_LOCATION.to_owned()
    } else {
        pointer.to_owned()
    }
}

#[derive(Debug)]
enum SchemaLoadFailure {
    NotFound(Vec<PathBuf>),
    Invalid(String),
}

impl SchemaLoadFailure {
    fn to_error(&self) -> Error {
        match self {
            Self::NotFound(candidates) => Error::SchemaNotFound {
                candidates: candidates.clone(),
            },
            Self::Invalid(reason) => Error::Config(reason.clone()),
        }
    }
}

struct LoadedSchema {
    path: PathBuf,
    compiled: JSONSchema,
}

/// Loads the schema from the first existing candidate location on first use
/// and keeps it, or the failure, for the provider's lifetime.
pub struct FileSchemaProvider {
    locations: SchemaLocations,
    loaded: OnceLock<std::result::Result<LoadedSchema, SchemaLoadFailure>>,
}

impl FileSchemaProvider {
    pub fn new(locations: SchemaLocations) -> Self {
        Self {
            locations,
            loaded: OnceLock::new(),
        }
    }

    pub fn locations(&self) -> &SchemaLocations {
        &self.locations
    }

    /// Path the schema was loaded from, once it has been loaded.
    pub fn source_path(&self) -> Option<&Path> {
        match self.loaded.get() {
            Some(Ok(loaded)) => Some(loaded.path.as_path()),
            _ => None,
        }
    }

    fn load(&self) -> std::result::Result<LoadedSchema, SchemaLoadFailure> {
        let path = self
            .locations
            .first_existing()
            .ok_or_else(|| SchemaLoadFailure::NotFound(self.locations.candidates.clone()))?;

        let document = load_document(path).map_err(|err| {
            SchemaLoadFailure::Invalid(format!(
                "failed to read schema '{}': {err}",
                path.display()
            ))
        })?;
        let compiled = JSONSchema::compile(&document).map_err(|err| {
            SchemaLoadFailure::Invalid(format!(
                "failed compiling schema '{}': {err}",
                path.display()
            ))
        })?;

        tracing::info!(path = %path.display(), "loaded configuration schema");
        Ok(LoadedSchema {
            path: path.to_path_buf(),
            compiled,
        })
    }
}

impl SchemaProvider for FileSchemaProvider {
    fn schema(&self) -> Result<&JSONSchema> {
        match self.loaded.get_or_init(|| self.load()) {
            Ok(loaded) => Ok(&loaded.compiled),
            Err(failure) => Err(failure.to_error()),
        }
    }
}

/// Schema compiled from an in-memory document.
pub struct StaticSchemaProvider {
    compiled: JSONSchema,
}

impl StaticSchemaProvider {
    pub fn new(schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::compile(schema)
            .map_err(|err| Error::Config(format!("failed compiling schema: {err}")))?;
        Ok(Self { compiled })
    }

    /// Accepts every tree.
    pub fn permissive() -> Self {
        Self {
            compiled: JSONSchema::compile(&Value::Object(Default::default()))
                .expect("empty schema always compiles"),
        }
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn schema(&self) -> Result<&JSONSchema> {
        Ok(&self.compiled)
    }
}

/// Process-wide provider probing [`SchemaLocations::from_env`].
pub fn default_provider() -> Arc<dyn SchemaProvider> {
    static DEFAULT: OnceLock<Arc<FileSchemaProvider>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Arc::new(FileSchemaProvider::new(SchemaLocations::from_env())))
        .clone()
}
