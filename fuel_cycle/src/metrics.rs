//! Metrics for scoring hike predictions against ground truth

use serde::{Deserialize, Serialize};

/// 2x2 confusion matrix for the hike / no-hike signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub r#fn: usize,
}

impl ConfusionMatrix {
    /// Count one (predicted, actual) pair
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.r#fn += 1,
        }
    }

    pub fn from_pairs<I: IntoIterator<Item = (bool, bool)>>(pairs: I) -> Self {
        let mut matrix = Self::default();
        for (predicted, actual) in pairs {
            matrix.record(predicted, actual);
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.r#fn
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Accuracy, precision, recall and F1 derived from a confusion matrix.
///
/// Zero denominators give 0 rather than NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub total_days: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub confusion: ConfusionMatrix,
}

impl ClassificationMetrics {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let precision = ratio(confusion.tp, confusion.tp + confusion.fp);
        let recall = ratio(confusion.tp, confusion.tp + confusion.r#fn);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            total_days: confusion.total(),
            accuracy: ratio(confusion.tp + confusion.tn, confusion.total()),
            precision,
            recall,
            f1_score,
            confusion,
        }
    }

    /// F1, or accuracy when F1 is exactly zero
    pub fn selection_score(&self) -> f64 {
        if self.f1_score == 0.0 {
            self.accuracy
        } else {
            self.f1_score
        }
    }
}

impl std::fmt::Display for ClassificationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Backtest Metrics ({} days):", self.total_days)?;
        writeln!(f, "  Accuracy:  {:.2}%", self.accuracy * 100.0)?;
        writeln!(f, "  Precision: {:.2}%", self.precision * 100.0)?;
        writeln!(f, "  Recall:    {:.2}%", self.recall * 100.0)?;
        writeln!(f, "  F1 Score:  {:.4}", self.f1_score)?;
        writeln!(
            f,
            "  Confusion: tp={} fp={} tn={} fn={}",
            self.confusion.tp, self.confusion.fp, self.confusion.tn, self.confusion.r#fn
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_classification_metrics() {
        let predicted = [true, false, false, true, false, true, true, true];
        let actual = [true, false, true, true, false, true, false, true];
        let matrix = ConfusionMatrix::from_pairs(predicted.into_iter().zip(actual));

        let metrics = ClassificationMetrics::from_confusion(matrix);
        assert_approx_eq!(metrics.accuracy, 0.75, 0.01);
        assert_approx_eq!(metrics.precision, 0.8, 0.01);
        assert_approx_eq!(metrics.recall, 0.8, 0.01);
        assert_approx_eq!(metrics.f1_score, 0.8, 0.01);
    }

    #[test]
    fn test_degenerate_denominators() {
        let matrix = ConfusionMatrix {
            tn: 10,
            ..Default::default()
        };
        let metrics = ClassificationMetrics::from_confusion(matrix);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1_score, 0.0);
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.selection_score(), 1.0);

        let empty = ClassificationMetrics::from_confusion(ConfusionMatrix::default());
        assert_eq!(empty.accuracy, 0.0);
    }

    #[test]
    fn test_confusion_serializes_plain_fn_key() {
        let json = serde_json::to_value(ConfusionMatrix { r#fn: 2, ..Default::default() }).unwrap();
        assert_eq!(json["fn"], 2);
    }
}
