//! Model training — fits the nearest-neighbour index over the pivot rows.

use bookrec_core::artifacts::{load_object, save_object};
use bookrec_core::config::ModelTrainerConfig;
use bookrec_core::RecommenderResult;
use bookrec_knn::{BookPivot, NearestNeighbors};
use tracing::info;

const STAGE: &str = "model training";

pub struct ModelTrainer {
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }

    pub fn train(&self) -> RecommenderResult<NearestNeighbors> {
        let pivot: BookPivot = load_object(&self.config.book_pivot_path)?;
        let model = NearestNeighbors::fit(&pivot, self.config.metric)?;

        save_object(&self.config.trained_model_path, &model)?;
        info!(path = %self.config.trained_model_path.display(), "Saved trained model");
        Ok(model)
    }

    pub fn initiate_model_trainer(&self) -> RecommenderResult<NearestNeighbors> {
        info!("==================== Model trainer started ====================");
        let model = self.train().map_err(|e| e.in_stage(STAGE))?;
        info!("==================== Model trainer completed ====================");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrec_core::config::DistanceMetric;
    use bookrec_core::{FinalRating, RecommenderError};

    fn row(user_id: u64, title: &str) -> FinalRating {
        FinalRating {
            user_id,
            isbn: title.to_string(),
            rating: 8.0,
            title: title.to_string(),
            author: String::new(),
            year: String::new(),
            publisher: String::new(),
            image_url: String::new(),
            num_of_rating: 1,
        }
    }

    #[test]
    fn test_train_writes_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelTrainerConfig {
            book_pivot_path: dir.path().join("pivot.bin"),
            trained_model_path: dir.path().join("model/model.bin"),
            metric: DistanceMetric::Euclidean,
        };
        let pivot = BookPivot::from_ratings(&[row(1, "A"), row(2, "B"), row(3, "C")]);
        save_object(&config.book_pivot_path, &pivot).unwrap();

        let model = ModelTrainer::new(config.clone()).initiate_model_trainer().unwrap();
        let stored: NearestNeighbors = load_object(&config.trained_model_path).unwrap();
        assert_eq!(stored, model);
        assert_eq!(stored.n_samples(), 3);
    }

    #[test]
    fn test_train_without_pivot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = ModelTrainer::new(ModelTrainerConfig {
            book_pivot_path: dir.path().join("absent.bin"),
            trained_model_path: dir.path().join("model.bin"),
            metric: DistanceMetric::Euclidean,
        });
        let err = trainer.initiate_model_trainer().unwrap_err();
        assert!(matches!(err.root(), RecommenderError::Io(_)));
    }
}
