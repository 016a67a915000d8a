//! Tag vocabulary and binary presence encoding.
//!
//! The vocabulary is the sorted set of distinct tags across a catalog. Slot
//! `i` of every feature vector corresponds to `tags()[i]`, so the same catalog
//! always produces the same layout.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::types::Destination;

/// Immutable mapping from tag to feature slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagVocabulary {
    tags: Vec<String>,
    slots: HashMap<String, usize>,
}

impl TagVocabulary {
    /// Collect the distinct tags of `catalog` in lexicographic order.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self, CatalogError> {
        let vocab = Self::from_tags(catalog.iter().flat_map(|d| d.tags.iter().cloned()));
        if vocab.is_empty() {
            return Err(CatalogError::DegenerateVocabulary);
        }
        Ok(vocab)
    }

    /// Build a vocabulary from arbitrary tags. Duplicates collapse and order
    /// is normalized, so any permutation of the input yields the same value.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        let tags: Vec<String> = sorted.into_iter().collect();
        let slots = tags
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.clone(), i))
            .collect();
        Self { tags, slots }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags in slot order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.slots.get(tag).copied()
    }

    /// Encode a tag set as a 0/1 vector of length [`len`](Self::len).
    ///
    /// Tags outside the vocabulary are ignored.
    pub fn encode<I, S>(&self, tags: I) -> Vec<f32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vector = vec![0.0; self.tags.len()];
        for tag in tags {
            if let Some(slot) = self.index_of(tag.as_ref()) {
                vector[slot] = 1.0;
            }
        }
        vector
    }

    pub fn encode_destination(&self, destination: &Destination) -> Vec<f32> {
        self.encode(&destination.tags)
    }

    /// Feature vectors for every destination, in catalog order.
    pub fn encode_catalog(&self, catalog: &Catalog) -> Vec<Vec<f32>> {
        catalog.iter().map(|d| self.encode_destination(d)).collect()
    }
}

impl From<Vec<String>> for TagVocabulary {
    fn from(tags: Vec<String>) -> Self {
        Self::from_tags(tags)
    }
}

impl From<TagVocabulary> for Vec<String> {
    fn from(vocab: TagVocabulary) -> Self {
        vocab.tags
    }
}
