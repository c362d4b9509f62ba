//! Fit scoring: pluggable, trait-based scorer that measures a candidate profile against a requirement set.
//!
//! Default: `WeightedFitScorer` (pure Rust, deterministic, no model call).
//! Alternate: `LlmFitScorer` (semantic, via the completion service), only when configured.
//!
//! `BatchOrchestrator` holds an `Arc<dyn FitScorer>`, chosen at startup via config.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::{CompletionService, LlmError};
use crate::models::profile::{CandidateProfile, RequirementSet};
use crate::parsing::fields::FieldMap;
use crate::parsing::json_scan;

pub mod normalize;
pub mod prompts;
pub mod weighted;

use prompts::{FIT_SCORE_PROMPT_TEMPLATE, FIT_SCORE_SYSTEM};

// ────────────────────────────────────────────────────────────────────────────
// Output data model (shared across all scorer backends)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitAssessment {
    pub score: f64, // 0 – 100, one decimal
    pub matching_points: Vec<String>,
    pub scorer_backend: String, // "weighted" | "llm"
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Scoring service failed: {0}")]
    Service(#[from] LlmError),

    #[error("Scoring response had no usable score: {0}")]
    MalformedResponse(String),

    #[error("Failed to serialize scoring input: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The fit scorer trait. Implement this to swap backends without touching
/// the orchestrator or the HTTP layer.
#[async_trait]
pub trait FitScorer: Send + Sync {
    async fn score(
        &self,
        profile: &CandidateProfile,
        requirements: &RequirementSet,
    ) -> Result<FitAssessment, ScoringError>;
}

// ────────────────────────────────────────────────────────────────────────────
// WeightedFitScorer
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic weighted scorer. See `weighted::compute_fit`.
pub struct WeightedFitScorer;

#[async_trait]
impl FitScorer for WeightedFitScorer {
    async fn score(
        &self,
        profile: &CandidateProfile,
        requirements: &RequirementSet,
    ) -> Result<FitAssessment, ScoringError> {
        Ok(weighted::compute_fit(profile, requirements))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmFitScorer
// ────────────────────────────────────────────────────────────────────────────

pub const LLM_BACKEND: &str = "llm";

const SCORE_ALIASES: &[(&str, &str)] = &[
    ("points", "matching_points"),
    ("reasons", "matching_points"),
    ("relevance_score", "score"),
];

/// Semantic fit scorer. Not deterministic; never the default.
pub struct LlmFitScorer {
    service: Arc<dyn CompletionService>,
}

impl LlmFitScorer {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl FitScorer for LlmFitScorer {
    async fn score(
        &self,
        profile: &CandidateProfile,
        requirements: &RequirementSet,
    ) -> Result<FitAssessment, ScoringError> {
        let prompt = FIT_SCORE_PROMPT_TEMPLATE
            .replace("{today}", &Utc::now().date_naive().format("%Y-%m-%d").to_string())
            .replace("{candidate_json}", &serde_json::to_string(profile)?)
            .replace("{requirements_json}", &serde_json::to_string(requirements)?);

        let response = self.service.complete(&prompt, FIT_SCORE_SYSTEM).await?;
        assessment_from_response(&response)
    }
}

fn assessment_from_response(response: &str) -> Result<FitAssessment, ScoringError> {
    let object = json_scan::first_object(response)
        .ok_or_else(|| ScoringError::MalformedResponse("no JSON object".to_string()))?;
    let fields = FieldMap::from_object(object, SCORE_ALIASES);

    let score = fields
        .number("score")
        .ok_or_else(|| ScoringError::MalformedResponse("missing score".to_string()))?;

    Ok(FitAssessment {
        score: (score.min(100.0) * 10.0).round() / 10.0,
        matching_points: fields.string_list("matching_points"),
        scorer_backend: LLM_BACKEND.to_string(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
