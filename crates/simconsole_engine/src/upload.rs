use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use simconsole_core::{validate_extension, UploadKind, ValidationError};

use crate::{ApiError, FailureKind};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read the file: {0}")]
    Decode(String),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let kind = match &err {
            UploadError::Validation(_) => FailureKind::Validation,
            UploadError::Read { .. } => FailureKind::Io,
            UploadError::Decode(_) => FailureKind::Decode,
        };
        ApiError::new(kind, err.to_string())
    }
}

/// Validates, reads and converts a schema file into the JSON body sent to
/// the backend. The extension is checked before the file is touched.
pub fn read_schema_file(path: &Path) -> Result<Value, UploadError> {
    validate_extension(UploadKind::Schema, &file_name(path))?;
    let text = read_text(path)?;
    convert_schema(&text)
}

/// Parses YAML text; the document must be a top-level mapping.
pub fn convert_schema(text: &str) -> Result<Value, UploadError> {
    let value: Value =
        serde_yaml::from_str(text).map_err(|err| UploadError::Decode(err.to_string()))?;
    if !value.is_object() {
        return Err(UploadError::Decode(
            "schema must be a YAML mapping at the top level".to_string(),
        ));
    }
    Ok(value)
}

/// Validates and reads a template file; the content is sent verbatim.
pub fn read_template_file(path: &Path) -> Result<String, UploadError> {
    validate_extension(UploadKind::Template, &file_name(path))?;
    read_text(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_text(path: &Path) -> Result<String, UploadError> {
    fs::read_to_string(path).map_err(|source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
