//! Score spaces of the two retrieval stages.
//!
//! A [`SimilarityScore`] comes from the vector index and a [`RelevanceScore`] from the reranker.
//! They are separate types with no conversion between them, so a stage-1 score can never be
//! compared against, or sorted together with, a stage-2 score.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Native similarity reported by the vector index. Higher means more similar.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityScore(f32);
impl SimilarityScore {
	pub const fn new(value: f32) -> Self {
		Self(value)
	}

	pub const fn value(self) -> f32 {
		self.0
	}
}

/// Reranker-assigned relevance. Only meaningful against other scores from the same reranker.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelevanceScore(f32);
impl RelevanceScore {
	pub const fn new(value: f32) -> Self {
		Self(value)
	}

	pub const fn value(self) -> f32 {
		self.0
	}

	/// Total order with NaN sorting below every real score.
	pub fn total_cmp(&self, other: &Self) -> Ordering {
		match (self.0.is_nan(), other.0.is_nan()) {
			(true, true) => Ordering::Equal,
			(true, false) => Ordering::Less,
			(false, true) => Ordering::Greater,
			(false, false) => self.0.total_cmp(&other.0),
		}
	}

	pub fn meets(self, threshold: f32) -> bool {
		self.0 >= threshold
	}
}
