use thiserror::Error;

/// Errors that can occur while loading a catalog or building its vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog file not found: {path}")]
    NotFound { path: String },
    #[error("failed to read catalog {path}: {message}")]
    Io { path: String, message: String },
    #[error("malformed catalog: {0}")]
    Parse(String),
    #[error("catalog contains no destinations")]
    EmptyCatalog,
    #[error("destination at index {index} is missing a non-empty `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("catalog yields an empty tag vocabulary; no destination carries a tag")]
    DegenerateVocabulary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_not_found_names_path() {
        let err = CatalogError::NotFound {
            path: "scripts/destinations.json".into(),
        };
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("scripts/destinations.json"));
    }

    #[test]
    fn error_display_missing_field() {
        let err = CatalogError::MissingField {
            index: 4,
            field: "name",
        };
        assert_eq!(
            err.to_string(),
            "destination at index 4 is missing a non-empty `name`"
        );
    }

    #[test]
    fn error_partial_eq() {
        assert_eq!(CatalogError::EmptyCatalog, CatalogError::EmptyCatalog);
        assert_ne!(
            CatalogError::EmptyCatalog,
            CatalogError::DegenerateVocabulary
        );
    }
}
