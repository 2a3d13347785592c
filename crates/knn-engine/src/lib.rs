//! Collaborative-filtering model: the title × user pivot matrix and the
//! nearest-neighbour index fitted over its rows.

pub mod model;
pub mod pivot;

pub use model::{NearestNeighbors, Neighbor};
pub use pivot::BookPivot;
