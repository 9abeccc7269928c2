use std::fmt;

/// Kind of file accepted by an upload operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Schema definition, YAML.
    Schema,
    /// Schema template, stored verbatim.
    Template,
}

impl UploadKind {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Schema => &["yaml", "yml"],
            UploadKind::Template => &["txt"],
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadKind::Schema => write!(f, "schema"),
            UploadKind::Template => write!(f, "template"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("file format not allowed for {kind}: {file_name} (expected {expected})")]
pub struct ValidationError {
    pub kind: UploadKind,
    pub file_name: String,
    pub expected: String,
}

/// Checks the extension of `file_name` for an upload of `kind`.
///
/// The extension is whatever follows the last `.`, compared
/// case-insensitively. A name without a dot is checked as a whole.
pub fn validate_extension(kind: UploadKind, file_name: &str) -> Result<(), ValidationError> {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let allowed = kind.allowed_extensions();
    if !extension.is_empty() && allowed.contains(&extension.as_str()) {
        return Ok(());
    }
    Err(ValidationError {
        kind,
        file_name: file_name.to_string(),
        expected: allowed
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::{validate_extension, UploadKind};

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_extension(UploadKind::Schema, "net.YAML").is_ok());
        assert!(validate_extension(UploadKind::Schema, "net.yml").is_ok());
        assert!(validate_extension(UploadKind::Template, "notes.Txt").is_ok());
    }

    #[test]
    fn only_last_segment_counts() {
        assert!(validate_extension(UploadKind::Schema, "net.yaml.txt").is_err());
        assert!(validate_extension(UploadKind::Template, "net.yaml.txt").is_ok());
    }

    #[test]
    fn bare_names_match_like_an_extension() {
        // A name without a dot is its own extension.
        assert!(validate_extension(UploadKind::Schema, "yaml").is_ok());
        assert!(validate_extension(UploadKind::Schema, "schema").is_err());
        assert!(validate_extension(UploadKind::Template, "").is_err());
    }
}
