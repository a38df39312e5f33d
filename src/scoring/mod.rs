//! Weighted combination of metric values into the composite network score.
//!
//! The score is a free linear combination: weights are non-negative but need
//! not sum to one, and the result is neither clamped nor normalized.

pub mod combine;
pub mod weights;

pub use combine::combine;
pub use weights::ScoringWeights;
