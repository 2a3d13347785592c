//! Model evaluation — leave-half-out recall@k.
//!
//! Each user's rating rows are split by position: the first half seeds
//! recommendations, the second half holds the titles the user actually
//! liked. The split is positional, not random, and users without liked
//! titles on either side are left out of the average rather than scored
//! as zero.

use bookrec_core::artifacts::{ensure_parent_dir, load_object};
use bookrec_core::config::EvaluationConfig;
use bookrec_core::{EvaluationReport, FinalRating, RecommenderError, RecommenderResult};
use bookrec_knn::{BookPivot, NearestNeighbors};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use tracing::{debug, info};

const STAGE: &str = "model evaluation";

/// Aggregate recall over all qualifying users.
#[derive(Debug, Clone, PartialEq)]
pub struct RecallSummary {
    pub mean_recall: f64,
    pub users_evaluated: usize,
    pub users_skipped: usize,
}

pub struct ModelEvaluator {
    config: EvaluationConfig,
}

impl ModelEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self) -> RecommenderResult<EvaluationReport> {
        let model: NearestNeighbors = load_object(&self.config.trained_model_path)?;
        info!(path = %self.config.trained_model_path.display(), "Loaded trained model");
        let pivot: BookPivot = load_object(&self.config.book_pivot_path)?;
        let final_rating: Vec<FinalRating> = load_object(&self.config.final_rating_path)?;
        info!(rows = final_rating.len(), "Loaded book pivot and final rating data");

        info!(top_k = self.config.top_k, "Calculating recall");
        let summary = recall_at_k(
            &final_rating,
            &pivot,
            &model,
            self.config.relevance_threshold,
            self.config.top_k,
        )?;
        info!(
            recall = summary.mean_recall,
            users_evaluated = summary.users_evaluated,
            users_skipped = summary.users_skipped,
            "Recall @{}",
            self.config.top_k
        );

        let report = EvaluationReport {
            top_k: self.config.top_k,
            recall_at_k: summary.mean_recall,
            users_evaluated: summary.users_evaluated,
            users_skipped: summary.users_skipped,
            generated_at: chrono::Utc::now(),
        };
        ensure_parent_dir(&self.config.evaluation_output)?;
        serde_json::to_writer_pretty(File::create(&self.config.evaluation_output)?, &report)?;
        info!(path = %self.config.evaluation_output.display(), "Saved evaluation report");

        Ok(report)
    }

    pub fn initiate_model_evaluation(&self) -> RecommenderResult<EvaluationReport> {
        info!("==================== Model evaluator started ====================");
        let report = self.evaluate().map_err(|e| e.in_stage(STAGE))?;
        info!("==================== Model evaluator completed ====================");
        Ok(report)
    }
}

/// Mean recall@`top_k` over users that have both liked training titles and
/// liked test titles.
pub fn recall_at_k(
    final_rating: &[FinalRating],
    pivot: &BookPivot,
    model: &NearestNeighbors,
    threshold: f64,
    top_k: usize,
) -> RecommenderResult<RecallSummary> {
    if top_k == 0 {
        return Err(RecommenderError::Evaluation("top_k must be positive".to_string()));
    }

    let mut by_user: BTreeMap<u64, Vec<&FinalRating>> = BTreeMap::new();
    for row in final_rating {
        by_user.entry(row.user_id).or_default().push(row);
    }

    let n_neighbors = (top_k + 1).min(model.n_samples());
    let mut recalls = Vec::new();

    for (user_id, rows) in &by_user {
        let (train, test) = rows.split_at(rows.len() / 2);

        let relevant: HashSet<&str> = test
            .iter()
            .filter(|r| r.rating >= threshold)
            .map(|r| r.title.as_str())
            .collect();
        if train.is_empty() || relevant.is_empty() {
            continue;
        }

        let seeds: Vec<&str> = train
            .iter()
            .filter(|r| r.rating >= threshold)
            .map(|r| r.title.as_str())
            .collect();
        if seeds.is_empty() {
            continue;
        }

        let predicted = most_frequent_neighbors(&seeds, pivot, model, n_neighbors, top_k)?;
        let hits = predicted
            .iter()
            .filter(|title| relevant.contains(title.as_str()))
            .count();
        let recall = hits as f64 / top_k.min(relevant.len()) as f64;
        debug!(user_id, hits, relevant = relevant.len(), recall, "Scored user");
        recalls.push(recall);
    }

    if recalls.is_empty() {
        return Err(RecommenderError::Evaluation(
            "no user has liked titles in both halves of their history".to_string(),
        ));
    }

    Ok(RecallSummary {
        mean_recall: recalls.iter().sum::<f64>() / recalls.len() as f64,
        users_evaluated: recalls.len(),
        users_skipped: by_user.len() - recalls.len(),
    })
}

/// The `top_k` titles recommended most often across all seeds. Ties keep
/// the order in which titles were first recommended.
fn most_frequent_neighbors(
    seeds: &[&str],
    pivot: &BookPivot,
    model: &NearestNeighbors,
    n_neighbors: usize,
    top_k: usize,
) -> RecommenderResult<Vec<String>> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut order: Vec<usize> = Vec::new();

    for seed in seeds {
        let Some(row) = pivot.position(seed) else {
            continue;
        };
        for neighbor in model.kneighbors_of_row(row, n_neighbors)?.into_iter().skip(1) {
            let count = counts.entry(neighbor.index).or_insert(0);
            if *count == 0 {
                order.push(neighbor.index);
            }
            *count += 1;
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    Ok(order
        .into_iter()
        .take(top_k)
        .filter_map(|index| pivot.title(index).map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrec_core::config::DistanceMetric;

    fn row(user_id: u64, title: &str, rating: f64) -> FinalRating {
        FinalRating {
            user_id,
            isbn: title.to_string(),
            rating,
            title: title.to_string(),
            author: String::new(),
            year: String::new(),
            publisher: String::new(),
            image_url: String::new(),
            num_of_rating: 1,
        }
    }

    fn fit(rows: &[FinalRating]) -> (BookPivot, NearestNeighbors) {
        let pivot = BookPivot::from_ratings(rows);
        let model = NearestNeighbors::fit(&pivot, DistanceMetric::Euclidean).unwrap();
        (pivot, model)
    }

    #[test]
    fn test_perfect_recall() {
        // Users 1 and 2 both love A and B; everything else is disjoint.
        let rows = vec![
            row(1, "A", 9.0),
            row(1, "B", 9.0),
            row(2, "A", 10.0),
            row(2, "B", 10.0),
            row(3, "C", 2.0),
            row(3, "D", 3.0),
        ];
        let (pivot, model) = fit(&rows);
        let summary = recall_at_k(&rows, &pivot, &model, 8.0, 1).unwrap();
        assert_eq!(summary.users_evaluated, 2);
        assert_eq!(summary.users_skipped, 1);
        assert_eq!(summary.mean_recall, 1.0);
    }

    #[test]
    fn test_skipped_users_do_not_lower_average() {
        let mut rows = vec![
            row(1, "A", 9.0),
            row(1, "B", 9.0),
            row(2, "A", 10.0),
            row(2, "B", 10.0),
        ];
        let (pivot, model) = fit(&rows);
        let base = recall_at_k(&rows, &pivot, &model, 8.0, 1).unwrap();

        // A user with a single row has an empty training half; one with no
        // liked test titles is also skipped.
        rows.push(row(5, "A", 9.0));
        rows.push(row(6, "A", 9.0));
        rows.push(row(6, "B", 1.0));
        let with_skips = recall_at_k(&rows, &pivot, &model, 8.0, 1).unwrap();

        assert_eq!(with_skips.users_evaluated, base.users_evaluated);
        assert_eq!(with_skips.users_skipped, 2);
        assert_eq!(with_skips.mean_recall, base.mean_recall);
    }

    #[test]
    fn test_recall_bounded() {
        let rows: Vec<FinalRating> = (0..6u64)
            .flat_map(|u| {
                (0..6u64).map(move |t| row(u, &format!("T{}", t), ((u * 3 + t * 5) % 11) as f64))
            })
            .collect();
        let (pivot, model) = fit(&rows);
        let summary = recall_at_k(&rows, &pivot, &model, 5.0, 10).unwrap();
        assert!(summary.users_evaluated > 0);
        assert!((0.0..=1.0).contains(&summary.mean_recall));
    }

    #[test]
    fn test_seeds_outside_pivot_score_zero() {
        let rows = vec![row(1, "A", 9.0), row(1, "B", 9.0), row(2, "C", 9.0)];
        let pivot = BookPivot::from_ratings(&rows[1..]);
        let model = NearestNeighbors::fit(&pivot, DistanceMetric::Euclidean).unwrap();
        let summary = recall_at_k(&rows, &pivot, &model, 8.0, 10).unwrap();
        assert_eq!(summary.users_evaluated, 1);
        assert_eq!(summary.mean_recall, 0.0);
    }

    #[test]
    fn test_no_qualifying_users_is_error() {
        let rows = vec![row(1, "A", 3.0), row(1, "B", 2.0)];
        let (pivot, model) = fit(&rows);
        let err = recall_at_k(&rows, &pivot, &model, 8.0, 10).unwrap_err();
        assert!(matches!(err, RecommenderError::Evaluation(_)));
    }

    #[test]
    fn test_most_frequent_breaks_ties_by_first_seen() {
        let rows = vec![
            row(1, "A", 9.0),
            row(1, "B", 8.0),
            row(2, "B", 9.0),
            row(2, "C", 9.0),
            row(3, "D", 1.0),
        ];
        let (pivot, model) = fit(&rows);
        let top = most_frequent_neighbors(&["A", "C"], &pivot, &model, 4, 2).unwrap();
        // B is a nearest neighbour of both seeds.
        assert_eq!(top[0], "B");
        assert_eq!(top.len(), 2);
    }
}
