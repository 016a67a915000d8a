//! # Wayfarer Catalog
//!
//! Destination records and the tag feature space derived from them.
//!
//! ## Contract
//!
//! - A [`Catalog`] is a non-empty, ordered list of [`Destination`] values
//!   with non-blank ids and names. It never changes after loading.
//! - A [`TagVocabulary`] is built once per catalog and passed by reference to
//!   every consumer. Its slot order is the lexicographic order of the
//!   distinct tags, so training and inference agree as long as the catalog
//!   is unchanged.
//! - Encoding is total: unknown tags are dropped without error.
//!
//! ## Example Usage
//!
//! ```
//! use catalog::{Catalog, TagVocabulary};
//!
//! let catalog = Catalog::from_json(r#"[
//!     {"id": 1, "name": "Manali", "tags": ["mountains", "trekking"]},
//!     {"id": 2, "name": "Goa", "tags": ["beach", "nightlife"]}
//! ]"#).unwrap();
//!
//! let vocab = TagVocabulary::from_catalog(&catalog).unwrap();
//! assert_eq!(vocab.tags(), ["beach", "mountains", "nightlife", "trekking"]);
//! assert_eq!(vocab.encode(["trekking", "surfing"]), vec![0.0, 0.0, 0.0, 1.0]);
//! ```

mod catalog;
mod error;
mod types;
pub mod vocab;

pub use crate::catalog::Catalog;
pub use crate::error::CatalogError;
pub use crate::types::{Destination, DestinationId};
pub use crate::vocab::TagVocabulary;

/// Load a catalog file and derive its vocabulary in one step.
pub fn load_catalog<P: AsRef<std::path::Path>>(
    path: P,
) -> Result<(Catalog, TagVocabulary), CatalogError> {
    let catalog = Catalog::load(path)?;
    let vocab = TagVocabulary::from_catalog(&catalog)?;
    Ok((catalog, vocab))
}
