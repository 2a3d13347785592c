//! Data transformation — pivots the clean table into the title × user
//! matrix and stores it together with its row order.

use bookrec_core::artifacts::{read_csv, save_object};
use bookrec_core::config::DataTransformationConfig;
use bookrec_core::{FinalRating, RecommenderResult};
use bookrec_knn::BookPivot;
use tracing::info;

const STAGE: &str = "data transformation";

pub struct DataTransformation {
    config: DataTransformationConfig,
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }

    pub fn get_data_transformer(&self) -> RecommenderResult<BookPivot> {
        let rows: Vec<FinalRating> = read_csv(&self.config.clean_data_file_path, b',')?;
        let pivot = BookPivot::from_ratings(&rows);
        let (titles, users) = pivot.shape();
        info!(titles, users, "Built book pivot table");

        save_object(&self.config.book_pivot_path, &pivot)?;
        info!(path = %self.config.book_pivot_path.display(), "Saved book_pivot serialization object");

        save_object(&self.config.book_names_path, &pivot.titles())?;
        info!(path = %self.config.book_names_path.display(), "Saved book_names serialization object");

        Ok(pivot)
    }

    pub fn initiate_data_transformation(&self) -> RecommenderResult<BookPivot> {
        info!("==================== Data transformation started ====================");
        let pivot = self.get_data_transformer().map_err(|e| e.in_stage(STAGE))?;
        info!("==================== Data transformation completed ====================");
        Ok(pivot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrec_core::artifacts::{load_object, write_csv};

    fn row(user_id: u64, title: &str, rating: f64) -> FinalRating {
        FinalRating {
            user_id,
            isbn: format!("isbn-{}", title),
            rating,
            title: title.to_string(),
            author: "Author".to_string(),
            year: "1999".to_string(),
            publisher: "Publisher".to_string(),
            image_url: format!("{}.jpg", title),
            num_of_rating: 1,
        }
    }

    #[test]
    fn test_artifacts_roundtrip_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = DataTransformationConfig {
            clean_data_file_path: dir.path().join("clean/clean_data.csv"),
            book_pivot_path: dir.path().join("transformed/book_pivot.bin"),
            book_names_path: dir.path().join("objects/book_names.bin"),
        };
        let rows = vec![
            row(1, "A", 9.0),
            row(2, "A", 8.0),
            row(3, "B", 7.0),
            row(1, "C", 10.0),
            row(2, "D", 5.0),
        ];
        write_csv(&config.clean_data_file_path, &rows).unwrap();

        let transformation = DataTransformation::new(config.clone());
        let first = transformation.initiate_data_transformation().unwrap();
        assert_eq!(first.shape(), (4, 3));

        let pivot: BookPivot = load_object(&config.book_pivot_path).unwrap();
        let names: Vec<String> = load_object(&config.book_names_path).unwrap();
        assert_eq!(pivot, first);
        assert_eq!(names, pivot.titles());

        let second = transformation.initiate_data_transformation().unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_missing_clean_csv_fails() {
        let dir = tempfile::tempdir().unwrap();
        let transformation = DataTransformation::new(DataTransformationConfig {
            clean_data_file_path: dir.path().join("absent.csv"),
            book_pivot_path: dir.path().join("pivot.bin"),
            book_names_path: dir.path().join("names.bin"),
        });
        let err = transformation.initiate_data_transformation().unwrap_err();
        assert!(err.to_string().starts_with("data transformation failed"));
    }
}
