//! # Wayfarer Recommend
//!
//! Top-k ranking of catalog destinations for one user profile.
//!
//! The ranking layer only knows the [`Scorer`] trait. Trained models,
//! dequantized artifacts and the cosine baseline all plug in the same way.
//!
//! - [`recommend`] ranks a ready feature vector.
//! - [`recommend_tags`] encodes tags through the vocabulary first.
//! - [`recommend_encoded`] reuses catalog vectors computed once by the caller.
//!
//! Ordering is by non-increasing score with catalog order as the tie-break.

mod ranking;
mod scorer;

pub use crate::ranking::{
    recommend, recommend_encoded, recommend_tags, RecommendConfig, RecommendError,
    Recommendation,
};
pub use crate::scorer::{CosineScorer, Scorer};
