use serde::{Deserialize, Serialize};

/// A row of the raw books table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(rename = "ISBN")]
    pub isbn: String,
    #[serde(rename = "Book-Title", alias = "title")]
    pub title: String,
    #[serde(rename = "Book-Author", alias = "author", default)]
    pub author: String,
    #[serde(rename = "Year-Of-Publication", alias = "year", default)]
    pub year: String,
    #[serde(rename = "Publisher", alias = "publisher", default)]
    pub publisher: String,
    /// The large cover image; the small and medium variants are dropped.
    #[serde(rename = "Image-URL-L", alias = "image_url", default)]
    pub image_url: String,
}

/// A row of the raw ratings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    #[serde(rename = "User-ID", alias = "user_id")]
    pub user_id: u64,
    #[serde(rename = "ISBN")]
    pub isbn: String,
    #[serde(rename = "Book-Rating", alias = "rating")]
    pub rating: f64,
}

/// A row of the raw users table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "User-ID", alias = "user_id")]
    pub user_id: u64,
    #[serde(rename = "Location", alias = "location", default)]
    pub location: String,
    #[serde(
        rename = "Age",
        alias = "age",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub age: Option<f64>,
}

/// One rating event of the clean, joined table.
///
/// Field order is the column order of the clean CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRating {
    pub user_id: u64,
    #[serde(rename = "ISBN")]
    pub isbn: String,
    pub rating: f64,
    pub title: String,
    pub author: String,
    pub year: String,
    pub publisher: String,
    pub image_url: String,
    pub num_of_rating: usize,
}

/// Five similar titles and their covers, in neighbour order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub query: String,
    pub titles: Vec<String>,
    pub poster_urls: Vec<String>,
}

/// Outcome of the recall@k evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub top_k: usize,
    pub recall_at_k: f64,
    pub users_evaluated: usize,
    pub users_skipped: usize,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
