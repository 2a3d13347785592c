//! Similar-book recommendations — collaborative filtering over the fitted
//! nearest-neighbour model, with cover images from the final rating table.

use bookrec_core::artifacts::load_object;
use bookrec_core::config::ModelRecommendationConfig;
use bookrec_core::{FinalRating, Recommendation, RecommenderError, RecommenderResult};
use bookrec_knn::{BookPivot, NearestNeighbors};
use tracing::{debug, info};

/// Number of similar titles returned per query.
pub const RECOMMENDATION_COUNT: usize = 5;

const STAGE: &str = "recommendation";

/// Answers "books similar to X" queries.
///
/// Holds only paths: model, pivot and rating table are loaded fresh on
/// every call, so a retrain is picked up without a restart.
pub struct Recommender {
    config: ModelRecommendationConfig,
}

impl Recommender {
    pub fn new(config: ModelRecommendationConfig) -> Self {
        Self { config }
    }

    /// Every title that can be queried, in pivot row order.
    pub fn book_names(&self) -> RecommenderResult<Vec<String>> {
        load_object(&self.config.book_names_path).map_err(|e| e.in_stage(STAGE))
    }

    /// The five titles nearest to `book_name` and their cover URLs.
    ///
    /// Titles are matched exactly against the pivot rows; the first match
    /// wins. Fails without a partial result when the title, a cover or an
    /// artifact is missing.
    pub fn recommend_book(&self, book_name: &str) -> RecommenderResult<Recommendation> {
        self.recommend(book_name).map_err(|e| e.in_stage(STAGE))
    }

    fn recommend(&self, book_name: &str) -> RecommenderResult<Recommendation> {
        let model: NearestNeighbors = load_object(&self.config.trained_model_path)?;
        let pivot: BookPivot = load_object(&self.config.book_pivot_path)?;

        let book_id = pivot
            .position(book_name)
            .ok_or_else(|| RecommenderError::TitleNotFound(book_name.to_string()))?;
        let suggestions = model.kneighbors_of_row(book_id, RECOMMENDATION_COUNT + 1)?;
        debug!(book_id, neighbors = suggestions.len(), "Queried nearest neighbours");

        let titles: Vec<String> = suggestions
            .iter()
            .skip(1)
            .map(|n| {
                pivot
                    .title(n.index)
                    .map(str::to_string)
                    .ok_or_else(|| RecommenderError::Model(format!("neighbour {} has no title", n.index)))
            })
            .collect::<RecommenderResult<_>>()?;

        let poster_urls = self.fetch_poster(&titles)?;

        info!(book = book_name, recommended = titles.len(), "Recommended books");
        Ok(Recommendation {
            query: book_name.to_string(),
            titles,
            poster_urls,
        })
    }

    /// Cover URL for each title: the image of the first rating row with
    /// that exact title.
    pub fn fetch_poster(&self, titles: &[String]) -> RecommenderResult<Vec<String>> {
        let final_rating: Vec<FinalRating> = load_object(&self.config.final_rating_path)?;
        titles
            .iter()
            .map(|title| {
                final_rating
                    .iter()
                    .find(|row| &row.title == title)
                    .map(|row| row.image_url.clone())
                    .ok_or_else(|| RecommenderError::CoverNotFound(title.clone()))
            })
            .collect()
    }
}
