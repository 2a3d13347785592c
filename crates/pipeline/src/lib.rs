//! Batch stages of the book recommender: ingestion, validation,
//! transformation, training and evaluation, plus the driver that runs
//! them in order. Stages communicate only through artifact files.

pub mod evaluation;
pub mod ingestion;
pub mod pipeline;
pub mod trainer;
pub mod transformation;
pub mod validation;

pub use evaluation::{recall_at_k, ModelEvaluator, RecallSummary};
pub use ingestion::DataIngestion;
pub use pipeline::{PipelineOutcome, TrainingPipeline};
pub use trainer::ModelTrainer;
pub use transformation::DataTransformation;
pub use validation::DataValidation;
