//! Deterministic weighted fit algorithm.
//!
//! Algorithm:
//! 1. Every dimension the requirements specify gets a match in [0, 1]:
//!    - skills: required 1.0 / preferred 0.5, each matched by the best profile
//!      skill (same normalized term 1.0, token containment 0.5)
//!    - education: best level ≥ required → 1.0, one level below → 0.5
//!    - experience: min(years / required, 1.0), 0 when years are not stated
//!    - languages, certifications, companies: fraction of items matched
//! 2. score = Σ(weight × match) / Σ(participating weights) × 100, one decimal
//! 3. Matching points come only from the overlap found in step 1.

use crate::models::profile::{CandidateProfile, EducationLevel, RequirementSet};

use super::normalize::best_match;
use super::FitAssessment;

pub const BACKEND: &str = "weighted";

pub const EMPTY_REQUIREMENTS_POINT: &str =
    "No scorable requirements were found in the job description";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Skills,
    Education,
    Experience,
    Languages,
    Certifications,
    Companies,
}

impl Dimension {
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Skills => 50.0,
            Dimension::Education => 25.0,
            Dimension::Experience => 15.0,
            Dimension::Languages => 4.0,
            Dimension::Certifications => 3.0,
            Dimension::Companies => 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DimensionScore {
    dimension: Dimension,
    matched: f64,
    points: Vec<String>,
}

pub fn compute_fit(profile: &CandidateProfile, requirements: &RequirementSet) -> FitAssessment {
    if requirements.is_empty() {
        return FitAssessment {
            score: 0.0,
            matching_points: vec![EMPTY_REQUIREMENTS_POINT.to_string()],
            scorer_backend: BACKEND.to_string(),
        };
    }

    let dimensions: Vec<DimensionScore> = [
        skills(profile, requirements),
        education(profile, requirements),
        experience(profile, requirements),
        list_dimension(
            Dimension::Languages,
            &requirements.languages,
            &profile.languages,
            "Speaks required language",
        ),
        list_dimension(
            Dimension::Certifications,
            &requirements.certifications,
            &profile.certifications,
            "Holds required certification",
        ),
        list_dimension(
            Dimension::Companies,
            &requirements.preferred_companies,
            &profile.companies,
            "Worked at preferred company",
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    let total_weight: f64 = dimensions.iter().map(|d| d.dimension.weight()).sum();
    let earned: f64 = dimensions
        .iter()
        .map(|d| d.dimension.weight() * d.matched)
        .sum();

    let score = if total_weight > 0.0 {
        round_one_decimal(earned / total_weight * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    FitAssessment {
        score,
        matching_points: dimensions.into_iter().flat_map(|d| d.points).collect(),
        scorer_backend: BACKEND.to_string(),
    }
}

fn skills(profile: &CandidateProfile, requirements: &RequirementSet) -> Option<DimensionScore> {
    let wanted = requirements
        .required_skills
        .iter()
        .map(|s| (s, 1.0, "required"))
        .chain(
            requirements
                .preferred_skills
                .iter()
                .map(|s| (s, 0.5, "preferred")),
        );

    let mut total = 0.0;
    let mut earned = 0.0;
    let mut points = Vec::new();

    for (skill, weight, kind) in wanted {
        total += weight;
        if let Some((strength, has)) = best_match(skill, &profile.skills) {
            earned += weight * strength;
            if strength >= 1.0 {
                points.push(format!("Has {kind} skill: {skill}"));
            } else {
                points.push(format!("Related to {kind} skill: {skill} (has {has})"));
            }
        }
    }

    (total > 0.0).then(|| DimensionScore {
        dimension: Dimension::Skills,
        matched: earned / total,
        points,
    })
}

fn education(profile: &CandidateProfile, requirements: &RequirementSet) -> Option<DimensionScore> {
    let required = requirements.education_level?;

    let (matched, points) = match profile.highest_education() {
        Some(level) if level >= required => (
            1.0,
            vec![format!(
                "Meets education requirement: {level} (required {required})"
            )],
        ),
        Some(level) if one_level_below(level, required) => (
            0.5,
            vec![format!(
                "Close to education requirement: {level} (required {required})"
            )],
        ),
        _ => (0.0, Vec::new()),
    };

    Some(DimensionScore {
        dimension: Dimension::Education,
        matched,
        points,
    })
}

fn one_level_below(level: EducationLevel, required: EducationLevel) -> bool {
    level as u8 + 1 == required as u8
}

fn experience(profile: &CandidateProfile, requirements: &RequirementSet) -> Option<DimensionScore> {
    let required = requirements.years_required?;

    let matched = if required <= 0.0 {
        1.0
    } else {
        profile
            .years_experience
            .map(|years| (years / required).min(1.0))
            .unwrap_or(0.0)
    };

    // Only a met threshold is a matching point; a shortfall still earns partial credit.
    let mut points = Vec::new();
    if let Some(years) = profile.years_experience {
        if required > 0.0 && years >= required {
            points.push(format!(
                "Has {} years of experience (required {})",
                format_years(years),
                format_years(required)
            ));
        }
    }

    Some(DimensionScore {
        dimension: Dimension::Experience,
        matched,
        points,
    })
}

/// Fraction of `required` items found in `have`; a related term counts as found.
fn list_dimension(
    dimension: Dimension,
    required: &[String],
    have: &[String],
    label: &str,
) -> Option<DimensionScore> {
    if required.is_empty() {
        return None;
    }

    let points: Vec<String> = required
        .iter()
        .filter(|item| best_match(item, have).is_some())
        .map(|item| format!("{label}: {item}"))
        .collect();

    Some(DimensionScore {
        dimension,
        matched: points.len() as f64 / required.len() as f64,
        points,
    })
}

fn format_years(years: f64) -> String {
    if years.fract() == 0.0 {
        format!("{years:.0}")
    } else {
        format!("{years:.1}")
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
