//! Pure article-processing stages: recency filtering, deduplication, ranking.

pub mod dedupe;
pub mod rank;
pub mod recency;

pub use dedupe::dedupe;
pub use rank::rank;
pub use recency::filter_recent;
