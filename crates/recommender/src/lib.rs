//! Recommendation serving — similar titles and their cover images.

pub mod recommendations;

pub use recommendations::{Recommender, RECOMMENDATION_COUNT};
