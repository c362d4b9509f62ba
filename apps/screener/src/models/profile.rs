use std::fmt;

use serde::{Deserialize, Serialize};

/// One education entry as extracted from a CV. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Structured candidate data. Absent fields stay `None`/empty; nothing is guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    /// Only set when the source states it explicitly.
    pub years_experience: Option<f64>,
    pub companies: Vec<String>,
    pub languages: Vec<String>,
    pub certifications: Vec<String>,
    pub education: Vec<EducationEntry>,
}

impl CandidateProfile {
    /// "First Last" from whichever name parts are present.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Highest education level recognizable from the degree strings.
    pub fn highest_education(&self) -> Option<EducationLevel> {
        self.education
            .iter()
            .filter_map(|e| e.degree.as_deref())
            .filter_map(EducationLevel::parse)
            .max()
    }
}

/// Ordered academic levels. Ordering is used for "meets or exceeds" checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

const DOCTORATE_TOKENS: &[&str] = &["phd", "doctorate", "doctoral", "doctor", "dphil", "edd"];
const MASTER_TOKENS: &[&str] = &["master", "masters", "msc", "ms", "ma", "mba", "meng", "mphil"];
const BACHELOR_TOKENS: &[&str] = &[
    "bachelor",
    "bachelors",
    "bsc",
    "bs",
    "ba",
    "beng",
    "btech",
    "undergraduate",
    "licence",
    "licenciatura",
];
const ASSOCIATE_TOKENS: &[&str] = &["associate", "associates"];
const HIGH_SCHOOL_TOKENS: &[&str] = &["highschool", "secondary", "ged"];

impl EducationLevel {
    /// Recognizes a level from free text like "B.Sc. Computer Science" or "Master's degree".
    pub fn parse(text: &str) -> Option<Self> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '.' | '\'' | '’'))
            .collect();
        let tokens: Vec<&str> = cleaned
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let has = |set: &[&str]| tokens.iter().any(|t| set.contains(t));

        if has(DOCTORATE_TOKENS) {
            Some(EducationLevel::Doctorate)
        } else if has(MASTER_TOKENS) {
            Some(EducationLevel::Master)
        } else if has(BACHELOR_TOKENS) {
            Some(EducationLevel::Bachelor)
        } else if has(ASSOCIATE_TOKENS) {
            Some(EducationLevel::Associate)
        } else if has(HIGH_SCHOOL_TOKENS) || cleaned.contains("high school") {
            Some(EducationLevel::HighSchool)
        } else {
            None
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EducationLevel::HighSchool => "High school",
            EducationLevel::Associate => "Associate's",
            EducationLevel::Bachelor => "Bachelor's",
            EducationLevel::Master => "Master's",
            EducationLevel::Doctorate => "Doctorate",
        };
        f.write_str(label)
    }
}

/// Normalized requirements extracted once per batch from the job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementSet {
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub education_level: Option<EducationLevel>,
    pub years_required: Option<f64>,
    pub languages: Vec<String>,
    pub certifications: Vec<String>,
    pub preferred_companies: Vec<String>,
}

impl RequirementSet {
    pub fn is_empty(&self) -> bool {
        self.required_skills.is_empty()
            && self.preferred_skills.is_empty()
            && self.education_level.is_none()
            && self.years_required.is_none()
            && self.languages.is_empty()
            && self.certifications.is_empty()
            && self.preferred_companies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_education_level_parses_common_degrees() {
        assert_eq!(
            EducationLevel::parse("B.Sc. Computer Science"),
            Some(EducationLevel::Bachelor)
        );
        assert_eq!(
            EducationLevel::parse("Bachelor's degree"),
            Some(EducationLevel::Bachelor)
        );
        assert_eq!(EducationLevel::parse("MSc Data Science"), Some(EducationLevel::Master));
        assert_eq!(EducationLevel::parse("MBA"), Some(EducationLevel::Master));
        assert_eq!(EducationLevel::parse("Ph.D. in Physics"), Some(EducationLevel::Doctorate));
        assert_eq!(EducationLevel::parse("High School Diploma"), Some(EducationLevel::HighSchool));
        assert_eq!(EducationLevel::parse("Coursework in cooking"), None);
    }

    #[test]
    fn test_education_level_ordering() {
        assert!(EducationLevel::Master > EducationLevel::Bachelor);
        assert!(EducationLevel::Doctorate > EducationLevel::Master);
        assert!(EducationLevel::HighSchool < EducationLevel::Associate);
    }

    #[test]
    fn test_highest_education_picks_max() {
        let profile = CandidateProfile {
            education: vec![
                EducationEntry {
                    degree: Some("BSc Mathematics".to_string()),
                    ..Default::default()
                },
                EducationEntry {
                    degree: Some("Master of Science".to_string()),
                    ..Default::default()
                },
                EducationEntry {
                    institution: Some("Online course".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(profile.highest_education(), Some(EducationLevel::Master));
    }

    #[test]
    fn test_full_name_with_partial_parts() {
        let mut profile = CandidateProfile {
            first_name: Some("Ada".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.full_name().as_deref(), Some("Ada"));
        profile.last_name = Some("Lovelace".to_string());
        assert_eq!(profile.full_name().as_deref(), Some("Ada Lovelace"));
        assert_eq!(CandidateProfile::default().full_name(), None);
    }
}
