use thiserror::Error;

pub type RecommenderResult<T> = Result<T, RecommenderError>;

#[derive(Error, Debug)]
pub enum RecommenderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Book title not found: {0}")]
    TitleNotFound(String),

    #[error("Cover image not found for title: {0}")]
    CoverNotFound(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<RecommenderError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecommenderError {
    /// Attach the name of the pipeline stage that failed.
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            already @ RecommenderError::Stage { .. } => already,
            other => RecommenderError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping stage wrappers.
    pub fn root(&self) -> &RecommenderError {
        match self {
            RecommenderError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<config::ConfigError> for RecommenderError {
    fn from(err: config::ConfigError) -> Self {
        RecommenderError::Config(err.to_string())
    }
}
