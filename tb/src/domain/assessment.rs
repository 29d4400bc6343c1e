//! Assessments, their types and results

use burststore::now_ms;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::keys;
use super::record::impl_record;

/// A graded piece of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_type_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,

    /// Contribution to the final grade, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,

    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Assessment {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            title: title.into(),
            subject: None,
            assessment_type_id: None,
            due: None,
            weight: None,
            score: None,
            max_score: None,
            created_at: now_ms(),
            deleted_at: None,
        }
    }

    /// Score as a percentage of the maximum, once both are known
    pub fn percentage(&self) -> Option<f64> {
        match (self.score, self.max_score) {
            (Some(score), Some(max)) if max > 0.0 => Some(score / max * 100.0),
            _ => None,
        }
    }
}

impl_record!(Assessment, keys::ASSESSMENTS, "assessment");

/// A kind of assessment (exam, essay, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentType {
    pub id: String,

    pub name: String,

    pub created_at: i64,
}

impl AssessmentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            created_at: now_ms(),
        }
    }
}

impl_record!(AssessmentType, keys::ASSESSMENT_TYPES, "assessment-type");

/// Weighted average percentage over assessments that have a result
///
/// Assessments without a weight count with weight 1.
pub fn weighted_average(assessments: &[Assessment]) -> Option<f64> {
    let (sum, weights) = assessments
        .iter()
        .filter(|a| a.deleted_at.is_none())
        .filter_map(|a| a.percentage().map(|pct| (pct, a.weight.unwrap_or(1.0))))
        .fold((0.0, 0.0), |(sum, weights), (pct, weight)| (sum + pct * weight, weights + weight));
    (weights > 0.0).then(|| sum / weights)
}
