use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use crate::error::CatalogError;
use crate::types::Destination;

/// An ordered, validated list of destinations.
///
/// Catalog order is significant: it is the tie-break order for ranking and
/// the index space used by training pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    destinations: Vec<Destination>,
}

impl Catalog {
    /// Build a catalog from already-parsed records.
    ///
    /// Rejects an empty list and records with a blank id or name. Duplicate
    /// ids are tolerated but logged.
    pub fn from_destinations(destinations: Vec<Destination>) -> Result<Self, CatalogError> {
        if destinations.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut seen = HashSet::with_capacity(destinations.len());
        for (index, dest) in destinations.iter().enumerate() {
            if dest.id.is_blank() {
                return Err(CatalogError::MissingField { index, field: "id" });
            }
            if dest.name.trim().is_empty() {
                return Err(CatalogError::MissingField {
                    index,
                    field: "name",
                });
            }
            if !seen.insert(&dest.id) {
                warn!(id = %dest.id, index, "duplicate_destination_id");
            }
        }

        Ok(Self { destinations })
    }

    /// Parse a JSON array of `{id, name, tags}` records.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let destinations: Vec<Destination> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_destinations(destinations)
    }

    /// Read and parse a catalog file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => CatalogError::NotFound {
                path: shown.clone(),
            },
            _ => CatalogError::Io {
                path: shown.clone(),
                message: err.to_string(),
            },
        })?;

        let catalog = Self::from_json(&content)?;
        info!(path = %shown, destinations = catalog.len(), "catalog_loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Destination> {
        self.destinations.get(index)
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Destination> {
        self.destinations.iter()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Destination;
    type IntoIter = std::slice::Iter<'a, Destination>;

    fn into_iter(self) -> Self::IntoIter {
        self.destinations.iter()
    }
}
