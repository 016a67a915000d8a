//! # Wayfarer Pairs
//!
//! Synthetic training data for the two-tower recommender.
//!
//! Every generation step picks a random "seed" destination and treats its
//! tag vector as a synthetic user profile. The step yields:
//!
//! - a positive pair `(seed, seed, 1)`, and
//! - a negative pair `(seed, other, 0)` where `other` shares no tag with the
//!   seed, found by rejection sampling.
//!
//! Rejection sampling is bounded by [`PairConfig::max_attempts`] random
//! draws, followed by one scan of the catalog. A catalog in which some seed
//! overlaps every other destination (for example through a tag carried by
//! all of them) ends the search with
//! [`SampleError::NoDisjointDestination`], or with a least-overlap pick when
//! [`ExhaustionPolicy::LeastOverlap`] is configured.
//!
//! Generation is deterministic for a fixed [`PairConfig::seed`].
//!
//! ```
//! use catalog::{Catalog, TagVocabulary};
//! use pairs::{sample_pairs, PairConfig};
//!
//! let catalog = Catalog::from_json(r#"[
//!     {"id": 1, "name": "Manali", "tags": ["mountains"]},
//!     {"id": 2, "name": "Goa", "tags": ["beach"]}
//! ]"#).unwrap();
//! let vocab = TagVocabulary::from_catalog(&catalog).unwrap();
//!
//! let set = sample_pairs(&catalog, &vocab, &PairConfig::new().with_iterations(100)).unwrap();
//! assert_eq!(set.positive_count(), 100);
//! assert_eq!(set.negative_count(), 100);
//! ```

pub mod config;
mod pair;
mod sampler;

pub use crate::config::{ExhaustionPolicy, PairConfig, SampleError};
pub use crate::pair::{PairSet, TrainingPair};
pub use crate::sampler::{sample_pairs, sample_pairs_encoded};
