//! The label set and prediction decoding.
//!
//! Labels are fixed at load time, either from the built-in role list or from
//! the unique values of a CSV column of historical labeled data. Decoding maps
//! a model probability vector back to human-readable roles; an index outside
//! the label set resolves to the "Unknown" sentinel rather than failing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Sentinel returned when a predicted index falls outside the label set.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Job roles the bundled model was trained against, in output-index order.
const DEFAULT_JOB_ROLES: [&str; 25] = [
    "Software Engineer",
    "Data Scientist",
    "Product Manager",
    "Cybersecurity Analyst",
    "ML Engineer",
    "Network Engineer",
    "Database Administrator",
    "Business Analyst",
    "AI Engineer",
    "Frontend Developer",
    "Backend Developer",
    "DevOps Engineer",
    "Cloud Architect",
    "Security Analyst",
    "Software Architect",
    "Mobile Developer",
    "Game Developer",
    "Blockchain Developer",
    "Technical Support",
    "Data Engineer",
    "UI/UX Designer",
    "Embedded Engineer",
    "IT Manager",
    "Full Stack Developer",
    "Systems Administrator",
];

#[derive(Debug, Error)]
pub enum LabelSetError {
    #[error("failed to read label CSV at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("label CSV at {path} has no column named \"{column}\"")]
    MissingColumn { path: PathBuf, column: String },

    #[error("label CSV at {path} produced no labels")]
    Empty { path: PathBuf },
}

/// The fixed, ordered list of job-role strings the model can output.
#[derive(Debug, Clone)]
pub struct LabelSet {
    labels: Vec<String>,
}

/// Top-1 prediction: the winning role and its confidence as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolePrediction {
    pub job_role: String,
    pub confidence: f32,
}

impl RolePrediction {
    fn unknown() -> Self {
        Self {
            job_role: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
        }
    }
}

/// Top-k prediction: the k best roles in descending probability order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRoles {
    pub job_roles: Vec<String>,
}

/// One decoded prediction, serialized as whichever shape was requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Single(RolePrediction),
    Ranked(TopRoles),
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// The built-in 25-role list, used when no label CSV is configured.
    pub fn default_roles() -> Self {
        Self::new(DEFAULT_JOB_ROLES.iter().map(|s| s.to_string()).collect())
    }

    /// Derives the label set from the unique values of `column` in the CSV at
    /// `path`, in order of first appearance. Blank cells are skipped.
    pub fn from_csv_column(path: &Path, column: &str) -> Result<Self, LabelSetError> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| LabelSetError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let headers = reader.headers().map_err(|source| LabelSetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let index = headers.iter().position(|h| h == column).ok_or_else(|| {
            LabelSetError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            }
        })?;

        let mut seen = HashSet::new();
        let mut labels = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| LabelSetError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let Some(value) = record.get(index) else {
                continue;
            };
            let value = value.trim();
            if !value.is_empty() && seen.insert(value.to_string()) {
                labels.push(value.to_string());
            }
        }

        if labels.is_empty() {
            return Err(LabelSetError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::new(labels))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Selects the argmax entry of `probabilities` and maps it to a role.
    ///
    /// An out-of-range argmax (model wider than the label set) resolves to
    /// the "Unknown" sentinel with zero confidence. Confidence is the winning
    /// probability scaled to a percentage and clamped into [0, 100].
    pub fn decode_top1(&self, probabilities: &[f32]) -> RolePrediction {
        let Some((index, best)) = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        else {
            return RolePrediction::unknown();
        };
        let Some(job_role) = self.labels.get(index) else {
            return RolePrediction::unknown();
        };
        RolePrediction {
            job_role: job_role.clone(),
            confidence: (best * 100.0).clamp(0.0, 100.0),
        }
    }

    /// Selects the `k` highest-probability indices, drops any outside the
    /// label set, and returns the surviving roles in descending probability
    /// order. When nothing survives, returns the "Unknown" sentinel alone.
    pub fn decode_top_k(&self, probabilities: &[f32], k: usize) -> TopRoles {
        let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let job_roles: Vec<String> = ranked
            .into_iter()
            .take(k)
            .filter_map(|(index, _)| self.labels.get(index).cloned())
            .collect();

        if job_roles.is_empty() {
            return TopRoles {
                job_roles: vec![UNKNOWN_LABEL.to_string()],
            };
        }
        TopRoles { job_roles }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Write;

    use super::*;

    fn three_labels() -> LabelSet {
        LabelSet::new(vec![
            "Software Engineer".to_string(),
            "Data Scientist".to_string(),
            "Product Manager".to_string(),
        ])
    }

    #[test]
    fn default_roles_match_model_width() {
        assert_eq!(LabelSet::default_roles().len(), 25);
    }

    #[test]
    fn top1_selects_argmax() {
        let prediction = three_labels().decode_top1(&[0.1, 0.7, 0.2]);
        assert_eq!(prediction.job_role, "Data Scientist");
        assert!((prediction.confidence - 70.0).abs() < 1e-4);
    }

    #[test]
    fn top1_confidence_is_clamped_to_percentage_range() {
        let prediction = three_labels().decode_top1(&[1.5, 0.0, 0.0]);
        assert_eq!(prediction.confidence, 100.0);
        let prediction = three_labels().decode_top1(&[-0.5, -0.9, -0.7]);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[test]
    fn top1_out_of_range_index_is_unknown() {
        // Model wider than the label set: argmax lands past the last label.
        let prediction = three_labels().decode_top1(&[0.1, 0.2, 0.3, 0.9]);
        assert_eq!(prediction.job_role, UNKNOWN_LABEL);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[test]
    fn top1_empty_vector_is_unknown() {
        let prediction = three_labels().decode_top1(&[]);
        assert_eq!(prediction.job_role, UNKNOWN_LABEL);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[test]
    fn top_k_orders_by_descending_probability() {
        let top = three_labels().decode_top_k(&[0.2, 0.5, 0.3], 2);
        assert_eq!(top.job_roles, vec!["Data Scientist", "Product Manager"]);
    }

    #[test]
    fn top_k_returns_at_most_k_unique_labels() {
        let top = three_labels().decode_top_k(&[0.2, 0.5, 0.3], 5);
        assert_eq!(top.job_roles.len(), 3);
        let unique: HashSet<&String> = top.job_roles.iter().collect();
        assert_eq!(unique.len(), top.job_roles.len());
    }

    #[test]
    fn top_k_filters_out_of_range_indices() {
        // Two phantom classes beyond the label set outrank everything.
        let top = three_labels().decode_top_k(&[0.1, 0.2, 0.15, 0.9, 0.8], 3);
        assert_eq!(top.job_roles, vec!["Data Scientist"]);
    }

    #[test]
    fn top_k_all_filtered_is_unknown_sentinel() {
        let labels = LabelSet::new(vec![]);
        let top = labels.decode_top_k(&[0.9, 0.8], 2);
        assert_eq!(top.job_roles, vec![UNKNOWN_LABEL]);
    }

    #[test]
    fn top_k_zero_is_unknown_sentinel() {
        let top = three_labels().decode_top_k(&[0.2, 0.5, 0.3], 0);
        assert_eq!(top.job_roles, vec![UNKNOWN_LABEL]);
    }

    #[test]
    fn csv_column_yields_unique_labels_in_first_seen_order() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Category,Resume").expect("write");
        writeln!(file, "Data Scientist,text a").expect("write");
        writeln!(file, "Software Engineer,text b").expect("write");
        writeln!(file, "Data Scientist,text c").expect("write");
        writeln!(file, " ,text d").expect("write");

        let labels = LabelSet::from_csv_column(file.path(), "Category").expect("load");
        assert_eq!(labels.len(), 2);
        let decoded = labels.decode_top1(&[1.0, 0.0]);
        assert_eq!(decoded.job_role, "Data Scientist");
    }

    #[test]
    fn csv_missing_column_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Role,Resume").expect("write");
        writeln!(file, "Data Scientist,text").expect("write");

        let err = LabelSet::from_csv_column(file.path(), "Category").expect_err("missing column");
        assert!(matches!(err, LabelSetError::MissingColumn { .. }));
    }

    #[test]
    fn csv_with_no_usable_rows_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Category,Resume").expect("write");

        let err = LabelSet::from_csv_column(file.path(), "Category").expect_err("no rows");
        assert!(matches!(err, LabelSetError::Empty { .. }));
    }
}
