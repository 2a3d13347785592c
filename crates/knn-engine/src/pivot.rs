//! Title × user rating matrix.
//!
//! Rows are distinct titles in ascending order, columns distinct user ids
//! in ascending order. A row's position is the book index every downstream
//! consumer uses, so the order is fixed at construction and never rebuilt.

use bookrec_core::FinalRating;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookPivot {
    titles: Vec<String>,
    user_ids: Vec<u64>,
    ratings: Array2<f64>,
}

impl BookPivot {
    /// Pivot rating rows into a dense matrix, 0.0 where a user never rated
    /// a title. Repeated (title, user) pairs are averaged.
    pub fn from_ratings(rows: &[FinalRating]) -> Self {
        let titles: BTreeSet<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        let user_ids: BTreeSet<u64> = rows.iter().map(|r| r.user_id).collect();

        let title_index: BTreeMap<&str, usize> =
            titles.iter().enumerate().map(|(i, t)| (*t, i)).collect();
        let user_index: BTreeMap<u64, usize> =
            user_ids.iter().enumerate().map(|(i, u)| (*u, i)).collect();

        let mut sums = Array2::<f64>::zeros((titles.len(), user_ids.len()));
        let mut counts = Array2::<u32>::zeros((titles.len(), user_ids.len()));
        for row in rows {
            let cell = [title_index[row.title.as_str()], user_index[&row.user_id]];
            sums[cell] += row.rating;
            counts[cell] += 1;
        }

        let ratings = ndarray::Zip::from(&sums)
            .and(&counts)
            .map_collect(|&sum, &count| if count > 0 { sum / count as f64 } else { 0.0 });

        Self {
            titles: titles.into_iter().map(str::to_string).collect(),
            user_ids: user_ids.into_iter().collect(),
            ratings,
        }
    }

    /// Titles in row order.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// User ids in column order.
    pub fn user_ids(&self) -> &[u64] {
        &self.user_ids
    }

    pub fn ratings(&self) -> &Array2<f64> {
        &self.ratings
    }

    pub fn shape(&self) -> (usize, usize) {
        self.ratings.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Row position of the first title equal to `title`.
    pub fn position(&self, title: &str) -> Option<usize> {
        self.titles.iter().position(|t| t == title)
    }

    pub fn title(&self, index: usize) -> Option<&str> {
        self.titles.get(index).map(String::as_str)
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.ratings.row(index)
    }

    /// The rating `user_id` gave `title`, 0.0 if absent.
    pub fn rating(&self, title: &str, user_id: u64) -> Option<f64> {
        let row = self.position(title)?;
        let col = self.user_ids.binary_search(&user_id).ok()?;
        Some(self.ratings[[row, col]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: u64, title: &str, rating: f64) -> FinalRating {
        FinalRating {
            user_id,
            isbn: format!("isbn-{}", title),
            rating,
            title: title.to_string(),
            author: String::new(),
            year: String::new(),
            publisher: String::new(),
            image_url: format!("{}.jpg", title),
            num_of_rating: 1,
        }
    }

    #[test]
    fn test_zero_fill_and_shape() {
        // Title "A" is rated by users 1 and 2 only.
        let rows = vec![
            rating(1, "A", 9.0),
            rating(2, "A", 7.0),
            rating(3, "B", 5.0),
            rating(1, "C", 8.0),
            rating(3, "D", 10.0),
        ];
        let pivot = BookPivot::from_ratings(&rows);

        assert_eq!(pivot.shape(), (4, 3));
        assert_eq!(pivot.titles(), ["A", "B", "C", "D"]);
        assert_eq!(pivot.user_ids(), [1, 2, 3]);
        assert_eq!(pivot.rating("A", 1), Some(9.0));
        assert_eq!(pivot.rating("A", 2), Some(7.0));
        assert_eq!(pivot.rating("A", 3), Some(0.0));
        assert_eq!(pivot.rating("B", 1), Some(0.0));
    }

    #[test]
    fn test_row_order_is_sorted_and_stable() {
        let rows = vec![
            rating(5, "Zen", 3.0),
            rating(2, "Alpha", 4.0),
            rating(9, "Middle", 6.0),
        ];
        let mut shuffled = rows.clone();
        shuffled.reverse();

        let a = BookPivot::from_ratings(&rows);
        let b = BookPivot::from_ratings(&shuffled);
        assert_eq!(a, b);
        assert_eq!(a.position("Middle"), Some(1));
        assert_eq!(a.title(2), Some("Zen"));
    }

    #[test]
    fn test_duplicate_pairs_are_averaged() {
        let rows = vec![rating(1, "A", 6.0), rating(1, "A", 10.0)];
        let pivot = BookPivot::from_ratings(&rows);
        assert_eq!(pivot.shape(), (1, 1));
        assert_eq!(pivot.rating("A", 1), Some(8.0));
    }

    #[test]
    fn test_empty() {
        let pivot = BookPivot::from_ratings(&[]);
        assert!(pivot.is_empty());
        assert_eq!(pivot.shape(), (0, 0));
        assert_eq!(pivot.position("A"), None);
    }
}
