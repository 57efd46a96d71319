//! Rating aggregation.
//!
//! The cached rating on an event is always recomputed from the full accepted
//! review set, never incremented, so it cannot drift. Calling [`summarize`]
//! twice over the same reviews yields identical values.

use crate::models::Review;

/// Recomputed values written back onto the event document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    /// Mean of accepted ratings, rounded to one decimal (half rounds up).
    pub rating: f64,
    /// Number of accepted reviews.
    pub review_count: u32,
}

impl RatingSummary {
    pub const EMPTY: RatingSummary = RatingSummary {
        rating: 0.0,
        review_count: 0,
    };
}

/// Summarizes the accepted subset of `reviews`.
///
/// Zero accepted reviews yields `{0.0, 0}` so stale cached values never
/// linger after the last accepted review disappears.
pub fn summarize(reviews: &[Review]) -> RatingSummary {
    let accepted: Vec<&Review> = reviews.iter().filter(|r| r.is_accepted()).collect();
    if accepted.is_empty() {
        return RatingSummary::EMPTY;
    }

    let sum: u32 = accepted.iter().map(|r| u32::from(r.rating)).sum();
    let mean = f64::from(sum) / accepted.len() as f64;
    RatingSummary {
        rating: round_one_decimal(mean),
        review_count: accepted.len() as u32,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
