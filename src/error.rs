use std::path::PathBuf;

/// Errors raised while reading a single content file.
///
/// The loaders never abort on these; they log and skip the file.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} has no frontmatter block")]
    MissingFrontmatter { path: PathBuf },

    #[error("invalid YAML in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path:?} is missing required field `{field}`")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("unparseable date `{value}` in {path:?}")]
    InvalidDate { path: PathBuf, value: String },

    #[error("slug `{slug}` in {path:?} may only use lowercase letters, digits, `-` and `_`")]
    InvalidSlug { path: PathBuf, slug: String },
}
