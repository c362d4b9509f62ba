//! Requirement extractor: pulls a normalized `RequirementSet` out of a raw job description.

use chrono::NaiveDate;

use super::fields::FieldMap;
use super::prompts::JD_PARSE_PROMPT_TEMPLATE;
use super::{truncate_chars, ParseError, SchemaKind, StructuredParser, StructuredRecord};
use crate::llm_client::prompts::NO_GUESSING_INSTRUCTION;
use crate::models::profile::{EducationLevel, RequirementSet};

/// Job description text beyond this many characters is not sent to the model.
pub const JD_CHAR_LIMIT: usize = 4000;

pub(super) const ALIASES: &[(&str, &str)] = &[
    ("required_skills", "skills_required"),
    ("skills", "skills_required"),
    ("must_have_skills", "skills_required"),
    ("preferred_skills", "skills_preferred"),
    ("nice_to_have", "skills_preferred"),
    ("nice_to_have_skills", "skills_preferred"),
    ("education", "education_required"),
    ("education_level", "education_required"),
    ("required_education", "education_required"),
    ("degree_required", "education_required"),
    ("years_experience", "years_required"),
    ("years_of_experience", "years_required"),
    ("min_years_experience", "years_required"),
    ("experience_years", "years_required"),
    ("languages", "languages_required"),
    ("required_languages", "languages_required"),
    ("certifications", "certifications_required"),
    ("required_certifications", "certifications_required"),
    ("companies", "companies_preferred"),
    ("preferred_companies", "companies_preferred"),
];

/// Extracts the requirement set once per batch.
#[derive(Clone)]
pub struct RequirementExtractor {
    parser: StructuredParser,
}

impl RequirementExtractor {
    pub fn new(parser: StructuredParser) -> Self {
        Self { parser }
    }

    pub async fn extract(&self, jd_text: &str) -> Result<RequirementSet, ParseError> {
        match self.parser.parse(jd_text, SchemaKind::Requirements).await? {
            StructuredRecord::Requirements(requirements) => Ok(requirements),
            other => Err(ParseError::UnexpectedRecord {
                expected: SchemaKind::Requirements,
                actual: other.kind(),
            }),
        }
    }
}

pub(super) fn build_prompt(jd_text: &str, today: NaiveDate) -> String {
    JD_PARSE_PROMPT_TEMPLATE
        .replace("{no_guessing}", NO_GUESSING_INSTRUCTION)
        .replace("{today}", &today.format("%Y-%m-%d").to_string())
        .replace("{jd_text}", truncate_chars(jd_text, JD_CHAR_LIMIT))
}

pub(super) fn requirements_from_fields(fields: &FieldMap) -> RequirementSet {
    let required_skills = fields.string_list("skills_required");

    // A skill listed as both required and preferred counts once, as required.
    let preferred_skills = fields
        .string_list("skills_preferred")
        .into_iter()
        .filter(|p| !required_skills.iter().any(|r| r.eq_ignore_ascii_case(p)))
        .collect();

    RequirementSet {
        required_skills,
        preferred_skills,
        education_level: fields
            .string("education_required")
            .as_deref()
            .and_then(EducationLevel::parse),
        years_required: fields.number("years_required"),
        languages: fields.string_list("languages_required"),
        certifications: fields.string_list("certifications_required"),
        preferred_companies: fields.string_list("companies_preferred"),
    }
}
