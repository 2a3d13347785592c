//! Training pipeline — runs every stage in dependency order.

use crate::evaluation::ModelEvaluator;
use crate::ingestion::DataIngestion;
use crate::trainer::ModelTrainer;
use crate::transformation::DataTransformation;
use crate::validation::DataValidation;
use bookrec_core::{AppConfig, EvaluationReport, RecommenderResult};
use std::time::Instant;
use tracing::info;

/// Summary of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub clean_rows: usize,
    pub titles: usize,
    pub users: usize,
    pub evaluation: Option<EvaluationReport>,
}

pub struct TrainingPipeline {
    config: AppConfig,
    skip_ingestion: bool,
    evaluate: bool,
}

impl TrainingPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            skip_ingestion: false,
            evaluate: true,
        }
    }

    /// Reuse raw files already present instead of downloading them.
    pub fn skip_ingestion(mut self, skip: bool) -> Self {
        self.skip_ingestion = skip;
        self
    }

    /// Run the recall evaluation after training.
    pub fn with_evaluation(mut self, evaluate: bool) -> Self {
        self.evaluate = evaluate;
        self
    }

    /// Run each stage to completion before starting the next; the first
    /// failure aborts the run.
    pub fn start_training_pipeline(&self) -> RecommenderResult<PipelineOutcome> {
        let start = Instant::now();

        if self.skip_ingestion {
            info!("Skipping data ingestion, using existing raw data");
        } else {
            DataIngestion::new(self.config.data_ingestion()).initiate_data_ingestion()?;
        }

        let final_rating =
            DataValidation::new(self.config.data_validation()?).initiate_data_validation()?;
        let pivot = DataTransformation::new(self.config.data_transformation())
            .initiate_data_transformation()?;
        ModelTrainer::new(self.config.model_trainer()).initiate_model_trainer()?;

        let evaluation = if self.evaluate {
            Some(ModelEvaluator::new(self.config.evaluation()).initiate_model_evaluation()?)
        } else {
            None
        };

        let (titles, users) = pivot.shape();
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            titles,
            users,
            "Training pipeline completed"
        );

        Ok(PipelineOutcome {
            clean_rows: final_rating.len(),
            titles,
            users,
            evaluation,
        })
    }
}
