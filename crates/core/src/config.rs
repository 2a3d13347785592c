use crate::error::{RecommenderError, RecommenderResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default location of the YAML configuration file.
pub const CONFIG_FILE_PATH: &str = "config/config.yaml";

/// Root application configuration. Loaded from a YAML file layered with
/// environment variables prefixed `BOOK_RECOMMENDER__`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_ingestion_config: IngestionSection,
    #[serde(default)]
    pub data_validation_config: ValidationSection,
    #[serde(default)]
    pub data_transformation_config: TransformationSection,
    #[serde(default)]
    pub model_trainer_config: TrainerSection,
    #[serde(default)]
    pub evaluation_config: EvaluationSection,
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSection {
    #[serde(default = "default_source_urls")]
    pub source_urls: BTreeMap<String, String>,
    #[serde(default = "default_raw_data_dir")]
    pub raw_data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSection {
    #[serde(default = "default_clean_data_dir")]
    pub clean_data_dir: PathBuf,
    #[serde(default = "default_serialized_objects_dir")]
    pub serialized_objects_dir: PathBuf,
    #[serde(default = "default_books_csv_file")]
    pub books_csv_file: String,
    #[serde(default = "default_ratings_csv_file")]
    pub ratings_csv_file: String,
    #[serde(default = "default_users_csv_file")]
    pub users_csv_file: String,
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: String,
    /// Users need strictly more ratings than this to be kept.
    #[serde(default = "default_min_user_ratings")]
    pub min_user_ratings: usize,
    /// Titles need at least this many ratings to be kept.
    #[serde(default = "default_min_book_ratings")]
    pub min_book_ratings: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformationSection {
    #[serde(default = "default_transformed_data_dir")]
    pub transformed_data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainerSection {
    #[serde(default = "default_trained_model_dir")]
    pub trained_model_dir: PathBuf,
    #[serde(default = "default_trained_model_name")]
    pub trained_model_name: String,
    #[serde(default)]
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationSection {
    #[serde(default = "default_evaluation_output")]
    pub evaluation_output: PathBuf,
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Distance used by the nearest-neighbour model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Cosine,
}

// Default functions
fn default_source_urls() -> BTreeMap<String, String> {
    BTreeMap::new()
}
fn default_raw_data_dir() -> PathBuf {
    PathBuf::from("artifacts/raw")
}
fn default_clean_data_dir() -> PathBuf {
    PathBuf::from("artifacts/clean")
}
fn default_serialized_objects_dir() -> PathBuf {
    PathBuf::from("artifacts/serialized_objects")
}
fn default_books_csv_file() -> String {
    "Books.csv".to_string()
}
fn default_ratings_csv_file() -> String {
    "Ratings.csv".to_string()
}
fn default_users_csv_file() -> String {
    "Users.csv".to_string()
}
fn default_csv_delimiter() -> String {
    ",".to_string()
}
fn default_min_user_ratings() -> usize {
    200
}
fn default_min_book_ratings() -> usize {
    50
}
fn default_transformed_data_dir() -> PathBuf {
    PathBuf::from("artifacts/transformed")
}
fn default_trained_model_dir() -> PathBuf {
    PathBuf::from("artifacts/model")
}
fn default_trained_model_name() -> String {
    "model.bin".to_string()
}
fn default_evaluation_output() -> PathBuf {
    PathBuf::from("artifacts/evaluation/report.json")
}
fn default_relevance_threshold() -> f64 {
    8.0
}
fn default_top_k() -> usize {
    10
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8501
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for IngestionSection {
    fn default() -> Self {
        Self {
            source_urls: default_source_urls(),
            raw_data_dir: default_raw_data_dir(),
        }
    }
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            clean_data_dir: default_clean_data_dir(),
            serialized_objects_dir: default_serialized_objects_dir(),
            books_csv_file: default_books_csv_file(),
            ratings_csv_file: default_ratings_csv_file(),
            users_csv_file: default_users_csv_file(),
            csv_delimiter: default_csv_delimiter(),
            min_user_ratings: default_min_user_ratings(),
            min_book_ratings: default_min_book_ratings(),
        }
    }
}

impl Default for TransformationSection {
    fn default() -> Self {
        Self {
            transformed_data_dir: default_transformed_data_dir(),
        }
    }
}

impl Default for TrainerSection {
    fn default() -> Self {
        Self {
            trained_model_dir: default_trained_model_dir(),
            trained_model_name: default_trained_model_name(),
            metric: DistanceMetric::default(),
        }
    }
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            evaluation_output: default_evaluation_output(),
            relevance_threshold: default_relevance_threshold(),
            top_k: default_top_k(),
        }
    }
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            metrics_port: default_metrics_port(),
        }
    }
}

// ─── Artifact file names ────────────────────────────────────────────────

pub const CLEAN_DATA_FILE: &str = "clean_data.csv";
pub const FINAL_RATING_FILE: &str = "final_rating.bin";
pub const BOOK_NAMES_FILE: &str = "book_names.bin";
pub const BOOK_PIVOT_FILE: &str = "book_pivot.bin";

// ─── Stage configs ──────────────────────────────────────────────────────
//
// Each stage receives one of these immutable path bundles instead of
// reading the configuration file itself.

#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub source_urls: BTreeMap<String, String>,
    pub raw_data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub books_csv_path: PathBuf,
    pub ratings_csv_path: PathBuf,
    pub users_csv_path: PathBuf,
    pub csv_delimiter: u8,
    pub min_user_ratings: usize,
    pub min_book_ratings: usize,
    pub clean_data_file_path: PathBuf,
    pub final_rating_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTransformationConfig {
    pub clean_data_file_path: PathBuf,
    pub book_pivot_path: PathBuf,
    pub book_names_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    pub book_pivot_path: PathBuf,
    pub trained_model_path: PathBuf,
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecommendationConfig {
    pub book_pivot_path: PathBuf,
    pub book_names_path: PathBuf,
    pub final_rating_path: PathBuf,
    pub trained_model_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub book_pivot_path: PathBuf,
    pub final_rating_path: PathBuf,
    pub trained_model_path: PathBuf,
    pub evaluation_output: PathBuf,
    pub relevance_threshold: f64,
    pub top_k: usize,
}

impl AppConfig {
    /// Load configuration from the given YAML file and environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Yaml)
                    .required(true),
            )
            .add_source(
                config::Environment::with_prefix("BOOK_RECOMMENDER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn data_ingestion(&self) -> DataIngestionConfig {
        let section = &self.data_ingestion_config;
        DataIngestionConfig {
            source_urls: section.source_urls.clone(),
            raw_data_dir: section.raw_data_dir.clone(),
        }
    }

    /// Fails when `csv_delimiter` is not exactly one byte.
    pub fn data_validation(&self) -> RecommenderResult<DataValidationConfig> {
        let raw = &self.data_ingestion_config.raw_data_dir;
        let section = &self.data_validation_config;
        let csv_delimiter = match section.csv_delimiter.as_bytes() {
            [byte] => *byte,
            _ => {
                return Err(RecommenderError::Config(format!(
                    "csv_delimiter must be a single byte, got {:?}",
                    section.csv_delimiter
                )))
            }
        };
        Ok(DataValidationConfig {
            books_csv_path: raw.join(&section.books_csv_file),
            ratings_csv_path: raw.join(&section.ratings_csv_file),
            users_csv_path: raw.join(&section.users_csv_file),
            csv_delimiter,
            min_user_ratings: section.min_user_ratings,
            min_book_ratings: section.min_book_ratings,
            clean_data_file_path: self.clean_data_file_path(),
            final_rating_path: self.final_rating_path(),
        })
    }

    pub fn data_transformation(&self) -> DataTransformationConfig {
        DataTransformationConfig {
            clean_data_file_path: self.clean_data_file_path(),
            book_pivot_path: self.book_pivot_path(),
            book_names_path: self.book_names_path(),
        }
    }

    pub fn model_trainer(&self) -> ModelTrainerConfig {
        ModelTrainerConfig {
            book_pivot_path: self.book_pivot_path(),
            trained_model_path: self.trained_model_path(),
            metric: self.model_trainer_config.metric,
        }
    }

    pub fn recommendation(&self) -> ModelRecommendationConfig {
        ModelRecommendationConfig {
            book_pivot_path: self.book_pivot_path(),
            book_names_path: self.book_names_path(),
            final_rating_path: self.final_rating_path(),
            trained_model_path: self.trained_model_path(),
        }
    }

    pub fn evaluation(&self) -> EvaluationConfig {
        let section = &self.evaluation_config;
        EvaluationConfig {
            book_pivot_path: self.book_pivot_path(),
            final_rating_path: self.final_rating_path(),
            trained_model_path: self.trained_model_path(),
            evaluation_output: section.evaluation_output.clone(),
            relevance_threshold: section.relevance_threshold,
            top_k: section.top_k,
        }
    }

    fn clean_data_file_path(&self) -> PathBuf {
        self.data_validation_config.clean_data_dir.join(CLEAN_DATA_FILE)
    }

    fn final_rating_path(&self) -> PathBuf {
        self.data_validation_config
            .serialized_objects_dir
            .join(FINAL_RATING_FILE)
    }

    fn book_names_path(&self) -> PathBuf {
        self.data_validation_config
            .serialized_objects_dir
            .join(BOOK_NAMES_FILE)
    }

    fn book_pivot_path(&self) -> PathBuf {
        self.data_transformation_config
            .transformed_data_dir
            .join(BOOK_PIVOT_FILE)
    }

    fn trained_model_path(&self) -> PathBuf {
        let section = &self.model_trainer_config;
        section.trained_model_dir.join(&section.trained_model_name)
    }

    /// Rebase every artifact directory under `root`. Used by tests and by
    /// the CLI `--artifacts-root` override.
    pub fn with_artifacts_root(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.data_ingestion_config.raw_data_dir = root.join("raw");
        self.data_validation_config.clean_data_dir = root.join("clean");
        self.data_validation_config.serialized_objects_dir = root.join("serialized_objects");
        self.data_transformation_config.transformed_data_dir = root.join("transformed");
        self.model_trainer_config.trained_model_dir = root.join("model");
        self.evaluation_config.evaluation_output = root.join("evaluation").join("report.json");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.data_ingestion_config.source_urls.is_empty());
        assert_eq!(config.data_validation_config.min_user_ratings, 200);
        assert_eq!(config.data_validation_config.min_book_ratings, 50);
        assert_eq!(config.model_trainer_config.metric, DistanceMetric::Euclidean);
        assert_eq!(config.evaluation_config.top_k, 10);
    }

    #[test]
    fn test_stage_paths_share_artifacts() {
        let config = AppConfig::default();
        let transformation = config.data_transformation();
        let trainer = config.model_trainer();
        let recommendation = config.recommendation();
        let evaluation = config.evaluation();

        assert_eq!(transformation.book_pivot_path, trainer.book_pivot_path);
        assert_eq!(trainer.trained_model_path, recommendation.trained_model_path);
        assert_eq!(recommendation.final_rating_path, evaluation.final_rating_path);
        assert_eq!(
            config.data_validation().unwrap().clean_data_file_path,
            transformation.clean_data_file_path
        );
        assert_eq!(
            trainer.trained_model_path,
            PathBuf::from("artifacts/model/model.bin")
        );
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
data_ingestion_config:
  source_urls:
    books: https://example.com/data/Books.csv
  raw_data_dir: data/raw
data_validation_config:
  clean_data_dir: data/clean
  serialized_objects_dir: data/objects
  books_csv_file: Books.csv
  ratings_csv_file: Ratings.csv
  users_csv_file: Users.csv
  csv_delimiter: ";"
  min_user_ratings: 3
data_transformation_config:
  transformed_data_dir: data/transformed
model_trainer_config:
  trained_model_dir: data/model
  trained_model_name: knn.bin
  metric: cosine
evaluation_config:
  evaluation_output: data/eval.json
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.data_ingestion_config.source_urls.len(), 1);
        assert_eq!(config.data_validation_config.min_user_ratings, 3);
        assert_eq!(config.data_validation_config.min_book_ratings, 50);
        assert_eq!(config.data_validation().unwrap().csv_delimiter, b';');
        assert_eq!(config.model_trainer_config.metric, DistanceMetric::Cosine);
        assert_eq!(
            config.data_validation().unwrap().books_csv_path,
            PathBuf::from("data/raw/Books.csv")
        );
        assert_eq!(
            config.model_trainer().trained_model_path,
            PathBuf::from("data/model/knn.bin")
        );
    }

    #[test]
    fn test_delimiter_must_be_one_byte() {
        let mut config = AppConfig::default();
        config.data_validation_config.csv_delimiter = "\t".to_string();
        assert_eq!(config.data_validation().unwrap().csv_delimiter, b'\t');

        for bad in ["", "||", "é"] {
            config.data_validation_config.csv_delimiter = bad.to_string();
            let err = config.data_validation().unwrap_err();
            assert!(matches!(err, RecommenderError::Config(_)), "{:?}", bad);
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load("does/not/exist.yaml").is_err());
    }

    #[test]
    fn test_with_artifacts_root() {
        let config = AppConfig::default().with_artifacts_root("/tmp/run");
        assert_eq!(
            config.recommendation().book_names_path,
            PathBuf::from("/tmp/run/serialized_objects/book_names.bin")
        );
    }
}
