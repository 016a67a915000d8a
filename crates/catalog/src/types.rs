use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a destination as it appears in the catalog file.
///
/// Catalogs in the wild use both numeric and string ids, so both are accepted
/// and rendered back exactly as they were written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DestinationId {
    Int(i64),
    Text(String),
}

impl DestinationId {
    pub(crate) fn is_blank(&self) -> bool {
        matches!(self, DestinationId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationId::Int(id) => write!(f, "{id}"),
            DestinationId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for DestinationId {
    fn from(value: i64) -> Self {
        DestinationId::Int(value)
    }
}

impl From<i32> for DestinationId {
    fn from(value: i32) -> Self {
        DestinationId::Int(i64::from(value))
    }
}

impl From<String> for DestinationId {
    fn from(value: String) -> Self {
        DestinationId::Text(value)
    }
}

impl From<&str> for DestinationId {
    fn from(value: &str) -> Self {
        DestinationId::Text(value.to_string())
    }
}

/// A single travel destination record.
///
/// `tags` keeps the order of the source file for display; set semantics are
/// available through [`Destination::tag_set`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub name: String,
    pub tags: Vec<String>,
}

impl Destination {
    pub fn new<I, S>(id: impl Into<DestinationId>, name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Distinct tags of this destination.
    pub fn tag_set(&self) -> BTreeSet<&str> {
        self.tags.iter().map(String::as_str).collect()
    }

    /// Number of distinct tags shared with `other`.
    pub fn overlap(&self, other: &Destination) -> usize {
        let mine = self.tag_set();
        other
            .tag_set()
            .into_iter()
            .filter(|tag| mine.contains(tag))
            .count()
    }

    /// `true` when the two destinations share no tag.
    pub fn is_disjoint(&self, other: &Destination) -> bool {
        self.tag_set().is_disjoint(&other.tag_set())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_deserializes_from_number_and_string() {
        let num: DestinationId = serde_json::from_str("7").unwrap();
        let text: DestinationId = serde_json::from_str("\"goa-01\"").unwrap();
        assert_eq!(num, DestinationId::Int(7));
        assert_eq!(text, DestinationId::Text("goa-01".into()));
        assert_eq!(num.to_string(), "7");
        assert_eq!(text.to_string(), "goa-01");
    }

    #[test]
    fn tag_set_collapses_duplicates() {
        let d = Destination::new(1, "Manali", ["snow", "mountains", "snow"]);
        assert_eq!(d.tag_set().len(), 2);
        assert_eq!(d.tags.len(), 3);
    }

    #[test]
    fn overlap_and_disjoint() {
        let a = Destination::new(1, "A", ["a", "b"]);
        let b = Destination::new(2, "B", ["c"]);
        let c = Destination::new(3, "C", ["a"]);
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
        assert_eq!(a.overlap(&c), 1);
        assert_eq!(a.overlap(&b), 0);
        assert_eq!(a.overlap(&a), 2);
    }

    #[test]
    fn blank_text_id_detected() {
        assert!(DestinationId::Text("  ".into()).is_blank());
        assert!(!DestinationId::Int(0).is_blank());
    }
}
