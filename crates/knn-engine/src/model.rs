//! Brute-force nearest-neighbour model over pivot rows.
//!
//! Fitting copies the reference rows; every query scans all of them. The
//! number of neighbours is chosen per query, not per fit.

use bookrec_core::config::DistanceMetric;
use bookrec_core::{RecommenderError, RecommenderResult};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::info;

use crate::pivot::BookPivot;

/// One neighbour of a query: its row position and distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// A fitted nearest-neighbour index. Immutable once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighbors {
    metric: DistanceMetric,
    samples: Array2<f64>,
}

impl NearestNeighbors {
    /// Fit the model on every row of the pivot table.
    ///
    /// Only an empty table is rejected; sparsity is irrelevant.
    pub fn fit(pivot: &BookPivot, metric: DistanceMetric) -> RecommenderResult<Self> {
        if pivot.is_empty() {
            return Err(RecommenderError::Model(
                "cannot fit on an empty pivot table".to_string(),
            ));
        }
        let (rows, cols) = pivot.shape();
        info!(rows, cols, ?metric, "Fitted nearest-neighbour model");
        Ok(Self {
            metric,
            samples: pivot.ratings().clone(),
        })
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.samples.ncols()
    }

    /// The `k` nearest samples to an arbitrary query vector, nearest first.
    /// Ties are broken by ascending row position.
    pub fn kneighbors(&self, query: ArrayView1<'_, f64>, k: usize) -> RecommenderResult<Vec<Neighbor>> {
        self.check_k(k)?;
        if query.len() != self.n_features() {
            return Err(RecommenderError::Model(format!(
                "query has {} features, model expects {}",
                query.len(),
                self.n_features()
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .samples
            .outer_iter()
            .enumerate()
            .map(|(index, sample)| Neighbor {
                index,
                distance: self.distance(query, sample),
            })
            .collect();
        neighbors.sort_by(by_distance_then_index);
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// The `k` nearest samples to the sample at `row`, with `row` itself
    /// always first even when other samples are at distance zero.
    pub fn kneighbors_of_row(&self, row: usize, k: usize) -> RecommenderResult<Vec<Neighbor>> {
        self.check_k(k)?;
        if row >= self.n_samples() {
            return Err(RecommenderError::Model(format!(
                "row {} out of range for {} samples",
                row,
                self.n_samples()
            )));
        }

        let query = self.samples.row(row);
        let mut others: Vec<Neighbor> = self
            .samples
            .outer_iter()
            .enumerate()
            .filter(|(index, _)| *index != row)
            .map(|(index, sample)| Neighbor {
                index,
                distance: self.distance(query, sample),
            })
            .collect();
        others.sort_by(by_distance_then_index);

        let mut neighbors = Vec::with_capacity(k);
        neighbors.push(Neighbor {
            index: row,
            distance: 0.0,
        });
        neighbors.extend(others.into_iter().take(k - 1));
        Ok(neighbors)
    }

    fn check_k(&self, k: usize) -> RecommenderResult<()> {
        if k == 0 {
            return Err(RecommenderError::Model("k must be positive".to_string()));
        }
        if k > self.n_samples() {
            return Err(RecommenderError::Model(format!(
                "requested {} neighbors but model holds {} samples",
                k,
                self.n_samples()
            )));
        }
        Ok(())
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self.metric {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Cosine => {
                let dot = a.dot(&b);
                let norms = a.dot(&a).sqrt() * b.dot(&b).sqrt();
                // An all-zero row is orthogonal to everything.
                if norms == 0.0 {
                    1.0
                } else {
                    1.0 - dot / norms
                }
            }
        }
    }
}

fn by_distance_then_index(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.index.cmp(&b.index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrec_core::FinalRating;
    use ndarray::array;

    fn rating(user_id: u64, title: &str, rating: f64) -> FinalRating {
        FinalRating {
            user_id,
            isbn: title.to_string(),
            rating,
            title: title.to_string(),
            author: String::new(),
            year: String::new(),
            publisher: String::new(),
            image_url: String::new(),
            num_of_rating: 1,
        }
    }

    fn sample_pivot() -> BookPivot {
        // A and B are liked by the same users; C and D by others.
        BookPivot::from_ratings(&[
            rating(1, "A", 9.0),
            rating(2, "A", 8.0),
            rating(1, "B", 9.0),
            rating(2, "B", 7.0),
            rating(3, "C", 10.0),
            rating(3, "D", 6.0),
            rating(4, "D", 9.0),
        ])
    }

    #[test]
    fn test_fit_rejects_empty() {
        let err = NearestNeighbors::fit(&BookPivot::from_ratings(&[]), DistanceMetric::Euclidean)
            .unwrap_err();
        assert!(matches!(err, RecommenderError::Model(_)));
    }

    #[test]
    fn test_self_is_first() {
        let model = NearestNeighbors::fit(&sample_pivot(), DistanceMetric::Euclidean).unwrap();
        let neighbors = model.kneighbors_of_row(0, 2).unwrap();
        assert_eq!(neighbors[0].index, 0);
        assert_eq!(neighbors[0].distance, 0.0);
        assert_eq!(neighbors[1].index, 1);
    }

    #[test]
    fn test_self_first_with_identical_rows() {
        let pivot = BookPivot::from_ratings(&[rating(1, "A", 5.0), rating(1, "B", 5.0)]);
        let model = NearestNeighbors::fit(&pivot, DistanceMetric::Euclidean).unwrap();
        let neighbors = model.kneighbors_of_row(1, 2).unwrap();
        assert_eq!(neighbors[0].index, 1);
        assert_eq!(neighbors[1].index, 0);
    }

    #[test]
    fn test_distances_ascending() {
        let model = NearestNeighbors::fit(&sample_pivot(), DistanceMetric::Euclidean).unwrap();
        let neighbors = model.kneighbors_of_row(3, 4).unwrap();
        assert_eq!(neighbors.len(), 4);
        for pair in neighbors[1..].windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_kneighbors_query_vector() {
        let model = NearestNeighbors::fit(&sample_pivot(), DistanceMetric::Euclidean).unwrap();
        let query = array![9.0, 8.0, 0.0, 0.0];
        let neighbors = model.kneighbors(query.view(), 1).unwrap();
        assert_eq!(neighbors[0].index, 0);
        assert!(neighbors[0].distance.abs() < 1e-12);
    }

    #[test]
    fn test_cosine_metric() {
        let model = NearestNeighbors::fit(&sample_pivot(), DistanceMetric::Cosine).unwrap();
        let neighbors = model.kneighbors_of_row(2, 4).unwrap();
        // C shares a user only with D.
        assert_eq!(neighbors[1].index, 3);
        assert!(neighbors.iter().all(|n| (0.0..=2.0).contains(&n.distance)));
    }

    #[test]
    fn test_k_bounds() {
        let model = NearestNeighbors::fit(&sample_pivot(), DistanceMetric::Euclidean).unwrap();
        assert!(model.kneighbors_of_row(0, 5).is_err());
        assert!(model.kneighbors_of_row(0, 0).is_err());
        assert!(model.kneighbors_of_row(9, 1).is_err());
        assert!(model.kneighbors(array![1.0].view(), 1).is_err());
    }

    #[test]
    fn test_nan_ratings_do_not_break_ordering() {
        let rows: Vec<FinalRating> = (0..60u64)
            .map(|i| {
                let value = if i % 3 == 0 { f64::NAN } else { (i % 10) as f64 };
                rating(i % 7, &format!("T{:02}", i), value)
            })
            .collect();
        let pivot = BookPivot::from_ratings(&rows);
        let model = NearestNeighbors::fit(&pivot, DistanceMetric::Euclidean).unwrap();

        for row in 0..model.n_samples() {
            let neighbors = model.kneighbors_of_row(row, 6).unwrap();
            assert_eq!(neighbors.len(), 6);
            assert_eq!(neighbors[0].index, row);
            let finite: Vec<f64> = neighbors[1..]
                .iter()
                .map(|n| n.distance)
                .filter(|d| !d.is_nan())
                .collect();
            assert!(finite.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_sparse_matrix_fits() {
        let rows: Vec<FinalRating> = (0..20)
            .map(|i| rating(i, &format!("T{:02}", i), 1.0))
            .collect();
        let pivot = BookPivot::from_ratings(&rows);
        let model = NearestNeighbors::fit(&pivot, DistanceMetric::Euclidean).unwrap();
        assert_eq!(model.n_samples(), 20);
        assert_eq!(model.n_features(), 20);
    }
}
