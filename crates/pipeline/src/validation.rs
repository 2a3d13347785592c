//! Data validation — joins the raw tables into one clean rating table.
//!
//! Keeps ratings from known, active users on books that have enough
//! ratings, one row per (user, title).

use bookrec_core::artifacts::{read_csv, save_object, write_csv};
use bookrec_core::config::DataValidationConfig;
use bookrec_core::{BookRecord, FinalRating, RatingRecord, RecommenderResult, UserRecord};
use std::collections::{HashMap, HashSet};
use tracing::info;

const STAGE: &str = "data validation";

pub struct DataValidation {
    config: DataValidationConfig,
}

impl DataValidation {
    pub fn new(config: DataValidationConfig) -> Self {
        Self { config }
    }

    /// Read the raw tables, build the clean table and write both the clean
    /// CSV and the serialized final rating table.
    pub fn prepare_clean_data(&self) -> RecommenderResult<Vec<FinalRating>> {
        let delimiter = self.config.csv_delimiter;
        let books: Vec<BookRecord> = read_csv(&self.config.books_csv_path, delimiter)?;
        let ratings: Vec<RatingRecord> = read_csv(&self.config.ratings_csv_path, delimiter)?;
        let users: Vec<UserRecord> = read_csv(&self.config.users_csv_path, delimiter)?;
        info!(
            books = books.len(),
            ratings = ratings.len(),
            users = users.len(),
            "Loaded raw tables"
        );

        let final_rating = build_final_rating(
            &books,
            &ratings,
            &users,
            self.config.min_user_ratings,
            self.config.min_book_ratings,
        );

        write_csv(&self.config.clean_data_file_path, &final_rating)?;
        info!(
            rows = final_rating.len(),
            path = %self.config.clean_data_file_path.display(),
            "Saved clean data"
        );
        save_object(&self.config.final_rating_path, &final_rating)?;
        info!(
            path = %self.config.final_rating_path.display(),
            "Saved final_rating serialization object"
        );

        Ok(final_rating)
    }

    pub fn initiate_data_validation(&self) -> RecommenderResult<Vec<FinalRating>> {
        info!("==================== Data validation started ====================");
        let final_rating = self.prepare_clean_data().map_err(|e| e.in_stage(STAGE))?;
        info!("==================== Data validation completed ====================");
        Ok(final_rating)
    }
}

/// Join and filter the raw tables.
///
/// Row order follows the ratings table throughout. Missing (non-finite)
/// ratings are dropped before any counting.
pub fn build_final_rating(
    books: &[BookRecord],
    ratings: &[RatingRecord],
    users: &[UserRecord],
    min_user_ratings: usize,
    min_book_ratings: usize,
) -> Vec<FinalRating> {
    let known_users: HashSet<u64> = users.iter().map(|u| u.user_id).collect();
    let ratings: Vec<&RatingRecord> = ratings
        .iter()
        .filter(|r| r.rating.is_finite() && known_users.contains(&r.user_id))
        .collect();

    let mut per_user: HashMap<u64, usize> = HashMap::new();
    for rating in &ratings {
        *per_user.entry(rating.user_id).or_insert(0) += 1;
    }
    let active: Vec<&RatingRecord> = ratings
        .into_iter()
        .filter(|r| per_user[&r.user_id] > min_user_ratings)
        .collect();

    let mut books_by_isbn: HashMap<&str, &BookRecord> = HashMap::new();
    for book in books {
        books_by_isbn.entry(book.isbn.as_str()).or_insert(book);
    }
    let joined: Vec<(&RatingRecord, &BookRecord)> = active
        .into_iter()
        .filter_map(|r| books_by_isbn.get(r.isbn.as_str()).map(|b| (r, *b)))
        .collect();

    let mut per_title: HashMap<&str, usize> = HashMap::new();
    for (_, book) in &joined {
        *per_title.entry(book.title.as_str()).or_insert(0) += 1;
    }

    let mut seen: HashSet<(u64, &str)> = HashSet::new();
    joined
        .into_iter()
        .filter(|(_, book)| per_title[book.title.as_str()] >= min_book_ratings)
        .filter(|&(rating, book)| seen.insert((rating.user_id, book.title.as_str())))
        .map(|(rating, book)| FinalRating {
            user_id: rating.user_id,
            isbn: rating.isbn.clone(),
            rating: rating.rating,
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year.clone(),
            publisher: book.publisher.clone(),
            image_url: book.image_url.clone(),
            num_of_rating: per_title[book.title.as_str()],
        })
        .collect()
}
