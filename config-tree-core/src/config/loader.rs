use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match ext.as_str() {
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Reads and parses a document into the JSON data model.
///
/// A missing file is reported as [`Error::ReferenceNotFound`]; callers that
/// load a base document remap it as needed.
pub fn load_document(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => Error::ReferenceNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(err),
    })?;

    tracing::debug!(path = %path.display(), "loaded configuration document");
    parse_document(path, &raw)
}

fn parse_document(path: &Path, raw: &str) -> Result<Value> {
    let parse_error = |reason: String| Error::Parse {
        path: path.to_path_buf(),
        reason,
    };

    match DocumentFormat::for_path(path) {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(raw).map_err(|err| parse_error(err.to_string()))
        }
        DocumentFormat::Yaml => {
            let yaml_value = serde_yaml::from_str::<serde_yaml::Value>(raw)
                .map_err(|err| parse_error(err.to_string()))?;
            serde_json::to_value(yaml_value)
                .map_err(|err| parse_error(format!("cannot convert yaml to json: {err}")))
        }
        DocumentFormat::Toml => {
            let toml_value =
                toml::from_str::<toml::Value>(raw).map_err(|err| parse_error(err.to_string()))?;
            serde_json::to_value(toml_value)
                .map_err(|err| parse_error(format!("cannot convert toml to json: {err}")))
        }
    }
}

/// Joins `value` onto `base` and returns an absolute, lexically normalised
/// path. The filesystem is not consulted beyond reading the working directory.
pub fn absolute_path(base: &Path, value: &Path) -> Result<PathBuf> {
    let joined = base.join(value);
    let joined = if joined.is_absolute() {
        joined
    } else {
        std::env::current_dir()?.join(joined)
    };
    Ok(normalize(&joined))
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
