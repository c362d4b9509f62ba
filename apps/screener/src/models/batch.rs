use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::profile::{CandidateProfile, RequirementSet};
use crate::scoring::FitAssessment;

/// Score for one candidate. Contact fields are copied from the profile for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub document_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// 0 – 100, one decimal.
    pub score: f64,
    pub matching_points: Vec<String>,
    pub scorer_backend: String, // "weighted" | "llm"
}

impl ScoreResult {
    pub fn new(document_id: &str, profile: CandidateProfile, fit: FitAssessment) -> Self {
        Self {
            document_id: document_id.to_string(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            phone: profile.phone,
            score: fit.score,
            matching_points: fit.matching_points,
            scorer_backend: fit.scorer_backend,
        }
    }

    /// Candidate name, or the document identifier when no name was extracted.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            self.document_id.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Pipeline phase a document was in. Used to attribute failures and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPhase {
    Submission,
    Extracting,
    Parsing,
    Scoring,
}

impl fmt::Display for DocumentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentPhase::Submission => "submission",
            DocumentPhase::Extracting => "extracting",
            DocumentPhase::Parsing => "parsing",
            DocumentPhase::Scoring => "scoring",
        };
        f.write_str(label)
    }
}

/// Per-document state machine: Pending → Extracting → Parsing → Scoring → Done,
/// or Failed from any state.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentState {
    Pending,
    Extracting,
    Parsing,
    Scoring,
    Done,
    Failed(String),
}

impl DocumentState {
    /// The phase a failure in this state should be attributed to.
    pub fn phase(&self) -> DocumentPhase {
        match self {
            DocumentState::Parsing => DocumentPhase::Parsing,
            DocumentState::Scoring | DocumentState::Done => DocumentPhase::Scoring,
            DocumentState::Pending | DocumentState::Extracting | DocumentState::Failed(_) => {
                DocumentPhase::Extracting
            }
        }
    }
}

/// A document that could not be processed, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub document_id: String,
    pub phase: DocumentPhase,
    pub reason: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    /// Descending by score; equal scores keep submission order.
    pub ranked: Vec<ScoreResult>,
    /// In submission order.
    pub failures: Vec<FailureRecord>,
    pub requirements: RequirementSet,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(score: f64) -> FitAssessment {
        FitAssessment {
            score,
            matching_points: vec!["Has required skill: Rust".to_string()],
            scorer_backend: "weighted".to_string(),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_document_id() {
        let anonymous = ScoreResult::new("cv_0042.pdf", CandidateProfile::default(), fit(10.0));
        assert_eq!(anonymous.display_name(), "cv_0042.pdf");

        let named = ScoreResult::new(
            "cv.pdf",
            CandidateProfile {
                first_name: Some("Grace".to_string()),
                last_name: Some("Hopper".to_string()),
                ..Default::default()
            },
            fit(90.0),
        );
        assert_eq!(named.display_name(), "Grace Hopper");
        assert_eq!(named.score, 90.0);
    }

    #[test]
    fn test_state_phase_attribution() {
        assert_eq!(DocumentState::Pending.phase(), DocumentPhase::Extracting);
        assert_eq!(DocumentState::Parsing.phase(), DocumentPhase::Parsing);
        assert_eq!(DocumentState::Scoring.phase(), DocumentPhase::Scoring);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&DocumentPhase::Submission).unwrap(),
            "\"submission\""
        );
    }
}
