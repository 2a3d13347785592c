//! Data ingestion — downloads the raw books, ratings and users tables.

use bookrec_core::config::DataIngestionConfig;
use bookrec_core::{RecommenderError, RecommenderResult};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::info;

const STAGE: &str = "data ingestion";

pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    /// Download every source URL into the raw data directory, naming each
    /// file after the URL's last path segment. Returns source name → path.
    ///
    /// There is no retry and no cleanup: a failed transfer can leave a
    /// truncated file behind.
    pub fn download_data(&self) -> RecommenderResult<BTreeMap<String, PathBuf>> {
        fs::create_dir_all(&self.config.raw_data_dir)?;
        let client = reqwest::blocking::Client::new();

        let mut downloaded = BTreeMap::new();
        for (source, url) in &self.config.source_urls {
            let file_name = file_name_from_url(url)?;
            let file_path = self.config.raw_data_dir.join(file_name);

            info!(source = %source, url = %url, "Downloading data");
            let mut response = client.get(url).send()?.error_for_status()?;
            let mut file = File::create(&file_path)?;
            let bytes = response.copy_to(&mut file)?;
            info!(source = %source, path = %file_path.display(), bytes, "Downloaded data");

            downloaded.insert(source.clone(), file_path);
        }

        info!(files = downloaded.len(), "All data files downloaded successfully");
        Ok(downloaded)
    }

    pub fn initiate_data_ingestion(&self) -> RecommenderResult<BTreeMap<String, PathBuf>> {
        info!("==================== Data ingestion started ====================");
        let downloaded = self.download_data().map_err(|e| e.in_stage(STAGE))?;
        info!("==================== Data ingestion completed ====================");
        Ok(downloaded)
    }
}

/// The final non-empty path segment of `url`.
pub fn file_name_from_url(url: &str) -> RecommenderResult<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| RecommenderError::Config(format!("invalid source url {}: {}", url, e)))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RecommenderError::Config(format!("source url {} has no file name", url)))
}
