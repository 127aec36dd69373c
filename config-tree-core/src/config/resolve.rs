use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::loader::{absolute_path, load_document};
use crate::config::settings::ResolverOptions;
use crate::error::{Error, Result};

/// Expands reference markers and path-suffixed keys inside a tree.
///
/// Referenced documents are resolved against their own directory, so chains
/// of relative references work at any depth. The set of documents currently
/// being expanded is tracked and a document that references itself, directly
/// or through other documents, fails with [`Error::ReferenceCycle`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    options: ResolverOptions,
}

impl ReferenceResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Returns the referenced path if `value` carries the reference marker.
    pub fn reference_target<'a>(&self, value: &'a str) -> Option<&'a str> {
        value.strip_prefix(self.options.reference_prefix.as_str())
    }

    /// Returns a resolved copy of `tree`; the input is left untouched.
    pub fn resolve(&self, tree: &Value, base_dir: &Path) -> Result<Value> {
        let mut chain = Vec::new();
        self.resolve_value(tree, base_dir, &mut chain)
    }

    /// Loads the document at `path` (relative to the working directory) and
    /// resolves it against its own directory.
    pub fn resolve_document(&self, path: &Path) -> Result<Value> {
        let mut chain = Vec::new();
        self.load_reference(path, Path::new(""), &mut chain)
    }

    fn resolve_value(
        &self,
        value: &Value,
        base_dir: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Value> {
        match value {
            Value::String(raw) => match self.reference_target(raw) {
                Some(target) => self.load_reference(Path::new(target), base_dir, chain),
                None => Ok(value.clone()),
            },
            Value::Object(map) => {
                let mut resolved = Map::new();
                for (key, entry) in map {
                    let entry = match entry {
                        Value::String(raw)
                            if self.reference_target(raw).is_none()
                                && key.ends_with(self.options.path_key_suffix.as_str()) =>
                        {
                            let absolute = absolute_path(base_dir, Path::new(raw))?;
                            Value::String(absolute.to_string_lossy().into_owned())
                        }
                        other => self.resolve_value(other, base_dir, chain)?,
                    };
                    resolved.insert(key.clone(), entry);
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item, base_dir, chain))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }

    fn load_reference(
        &self,
        target: &Path,
        base_dir: &Path,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Value> {
        let path = base_dir.join(target);
        let canonical = std::fs::canonicalize(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::ReferenceNotFound { path: path.clone() },
            _ => Error::Io(err),
        })?;

        if chain.contains(&canonical) {
            let mut cycle = chain.clone();
            cycle.push(canonical);
            return Err(Error::ReferenceCycle { chain: cycle });
        }

        tracing::debug!(
            reference = %canonical.display(),
            depth = chain.len(),
            "resolving configuration reference"
        );

        let document = load_document(&canonical)?;
        let document_dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        chain.push(canonical);
        let resolved = self.resolve_value(&document, &document_dir, chain);
        chain.pop();
        resolved
    }
}
