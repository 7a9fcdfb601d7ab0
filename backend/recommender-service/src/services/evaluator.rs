use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Rating, SimilarityMatrix, UserProfiles};
use crate::services::predictor::{predict, PredictorConfig};

/// Prediction quality over a held-out test split.
///
/// `mae`/`rmse` are `None` when nothing could be predicted — undefined is
/// not the same as a zero error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Test ratings that produced a prediction.
    pub count: usize,
    pub total_tested: usize,
    pub coverage: f64,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
}

/// Predict every test rating from the train-split profiles and accumulate
/// error metrics. Failed predictions count toward `total_tested` only.
pub fn evaluate(
    test: &[Rating],
    profiles: &UserProfiles,
    matrix: &SimilarityMatrix,
    config: &PredictorConfig,
) -> EvaluationReport {
    let mut count = 0usize;
    let mut abs_error_sum = 0.0;
    let mut squared_error_sum = 0.0;

    for rating in test {
        if let Some(predicted) = predict(profiles, &rating.user_id, &rating.book_id, matrix, config)
        {
            let error = predicted - rating.rating;
            abs_error_sum += error.abs();
            squared_error_sum += error * error;
            count += 1;
        }
    }

    let total_tested = test.len();
    let coverage = if total_tested == 0 {
        0.0
    } else {
        count as f64 / total_tested as f64
    };

    let (mae, rmse) = if count == 0 {
        (None, None)
    } else {
        (
            Some(abs_error_sum / count as f64),
            Some((squared_error_sum / count as f64).sqrt()),
        )
    };

    let report = EvaluationReport {
        count,
        total_tested,
        coverage,
        mae,
        rmse,
    };

    info!(
        count = report.count,
        total_tested = report.total_tested,
        coverage = report.coverage,
        mae = report.mae,
        rmse = report.rmse,
        "Evaluated model"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: &str, book_id: &str, rating: f64) -> Rating {
        Rating {
            user_id: user_id.to_string(),
            book_id: book_id.to_string(),
            rating,
        }
    }

    /// Profiles and matrix arranged so every test book is predicted exactly:
    /// the user rates three neighbors identically, so the weighted average
    /// equals that rating.
    fn perfect_fixture() -> (UserProfiles, SimilarityMatrix) {
        let mut profiles = UserProfiles::new();
        profiles.insert(
            "u1".to_string(),
            [("b1", 4.0), ("b2", 4.0), ("b3", 4.0)]
                .into_iter()
                .map(|(b, r)| (b.to_string(), r))
                .collect(),
        );

        let mut matrix = SimilarityMatrix::new();
        matrix.insert(
            "b4".to_string(),
            vec![
                ("b1".to_string(), 0.9),
                ("b2".to_string(), 0.6),
                ("b3".to_string(), 0.3),
            ],
        );

        (profiles, matrix)
    }

    #[test]
    fn test_perfect_predictions() {
        let (profiles, matrix) = perfect_fixture();
        let test = vec![rating("u1", "b4", 4.0)];

        let report = evaluate(&test, &profiles, &matrix, &PredictorConfig::default());

        assert_eq!(report.count, 1);
        assert_eq!(report.total_tested, 1);
        assert!((report.coverage - 1.0).abs() < f64::EPSILON);
        assert!(report.mae.unwrap().abs() < 1e-12);
        assert!(report.rmse.unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_failed_predictions_counted_in_total_only() {
        let (profiles, matrix) = perfect_fixture();
        // b9 has no neighbor entry; prediction fails but still counts.
        let test = vec![rating("u1", "b4", 5.0), rating("u1", "b9", 3.0)];

        let report = evaluate(&test, &profiles, &matrix, &PredictorConfig::default());

        assert_eq!(report.count, 1);
        assert_eq!(report.total_tested, 2);
        assert!((report.coverage - 0.5).abs() < f64::EPSILON);
        // Only the b4 error (|4 - 5| = 1) accumulates.
        assert!((report.mae.unwrap() - 1.0).abs() < 1e-12);
        assert!((report.rmse.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_predictions_leave_metrics_undefined() {
        let profiles = UserProfiles::new();
        let matrix = SimilarityMatrix::new();
        let test = vec![rating("u1", "b1", 3.0)];

        let report = evaluate(&test, &profiles, &matrix, &PredictorConfig::default());

        assert_eq!(report.count, 0);
        assert_eq!(report.total_tested, 1);
        assert_eq!(report.coverage, 0.0);
        assert!(report.mae.is_none());
        assert!(report.rmse.is_none());
    }
}
