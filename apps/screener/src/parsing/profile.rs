//! CV text → `CandidateProfile`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::fields::FieldMap;
use super::prompts::CV_PARSE_PROMPT_TEMPLATE;
use super::{truncate_chars, ParseError, SchemaKind, StructuredParser, StructuredRecord};
use crate::llm_client::prompts::NO_GUESSING_INSTRUCTION;
use crate::models::profile::{CandidateProfile, EducationEntry};

/// CV text beyond this many characters is not sent to the model.
pub const CV_CHAR_LIMIT: usize = 8000;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+").expect("valid regex")
});
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d\s\-]{6,}\d").expect("valid regex"));

pub(super) const ALIASES: &[(&str, &str)] = &[
    ("firstname", "first_name"),
    ("given_name", "first_name"),
    ("lastname", "last_name"),
    ("surname", "last_name"),
    ("family_name", "last_name"),
    ("name", "full_name"),
    ("candidate_name", "full_name"),
    ("e_mail", "email"),
    ("email_address", "email"),
    ("phone_number", "phone"),
    ("telephone", "phone"),
    ("mobile", "phone"),
    ("skill", "skills"),
    ("technical_skills", "skills"),
    ("years_of_experience", "years_experience"),
    ("experience_years", "years_experience"),
    ("total_experience", "years_experience"),
    ("company", "companies"),
    ("employers", "companies"),
    ("work_experience", "companies"),
    ("language", "languages"),
    ("spoken_languages", "languages"),
    ("certification", "certifications"),
    ("certificates", "certifications"),
    ("academic_background", "education"),
];

const EDUCATION_ALIASES: &[(&str, &str)] = &[
    ("school", "institution"),
    ("university", "institution"),
    ("college", "institution"),
    ("institute", "institution"),
    ("degree_name", "degree"),
    ("qualification", "degree"),
    ("title", "degree"),
    ("start", "start_date"),
    ("from", "start_date"),
    ("end", "end_date"),
    ("to", "end_date"),
    ("graduation_date", "end_date"),
];

/// Parses one CV into a `CandidateProfile`.
#[derive(Clone)]
pub struct ProfileParser {
    parser: StructuredParser,
}

impl ProfileParser {
    pub fn new(parser: StructuredParser) -> Self {
        Self { parser }
    }

    pub async fn parse(&self, cv_text: &str) -> Result<CandidateProfile, ParseError> {
        match self.parser.parse(cv_text, SchemaKind::CandidateProfile).await? {
            StructuredRecord::Profile(profile) => Ok(profile),
            other => Err(ParseError::UnexpectedRecord {
                expected: SchemaKind::CandidateProfile,
                actual: other.kind(),
            }),
        }
    }
}

/// Emails and phone numbers spotted by pattern, passed to the model as hints.
pub fn contact_hints(text: &str) -> (Vec<String>, Vec<String>) {
    let mut emails: Vec<String> = Vec::new();
    for m in EMAIL.find_iter(text) {
        let email = m.as_str().trim_end_matches('.').to_string();
        if !emails.contains(&email) {
            emails.push(email);
        }
    }

    let mut phones: Vec<String> = Vec::new();
    for m in PHONE.find_iter(text) {
        let phone = m.as_str().trim().to_string();
        if !phones.contains(&phone) {
            phones.push(phone);
        }
    }

    (emails, phones)
}

pub(super) fn build_prompt(cv_text: &str, today: NaiveDate) -> String {
    let text = truncate_chars(cv_text, CV_CHAR_LIMIT);
    let (emails, phones) = contact_hints(text);

    CV_PARSE_PROMPT_TEMPLATE
        .replace("{no_guessing}", NO_GUESSING_INSTRUCTION)
        .replace("{emails}", &hint_list(&emails))
        .replace("{phones}", &hint_list(&phones))
        .replace("{today}", &today.format("%Y-%m-%d").to_string())
        .replace("{cv_text}", text)
}

fn hint_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

pub(super) fn profile_from_fields(fields: &FieldMap) -> CandidateProfile {
    let mut first_name = fields.string("first_name");
    let mut last_name = fields.string("last_name");

    if first_name.is_none() && last_name.is_none() {
        if let Some(full) = fields.string("full_name") {
            let (first, last) = split_full_name(&full);
            first_name = first;
            last_name = last;
        }
    }

    CandidateProfile {
        first_name,
        last_name,
        email: fields.string("email"),
        phone: fields.string("phone"),
        skills: fields.string_list("skills"),
        years_experience: fields.number("years_experience"),
        companies: fields.string_list("companies"),
        languages: fields.string_list("languages"),
        certifications: fields.string_list("certifications"),
        education: education_entries(fields),
    }
}

/// "Ada King Lovelace" → ("Ada", "King Lovelace").
fn split_full_name(full: &str) -> (Option<String>, Option<String>) {
    let mut parts = full.split_whitespace();
    let first = parts.next().map(str::to_string);
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, (!rest.is_empty()).then_some(rest))
}

fn education_entries(fields: &FieldMap) -> Vec<EducationEntry> {
    fields
        .records("education", EDUCATION_ALIASES, |s| {
            Some(("degree".to_string(), Value::String(s)))
        })
        .into_iter()
        .map(|record| EducationEntry {
            institution: record.string("institution"),
            degree: record.string("degree"),
            start_date: record.string("start_date"),
            end_date: record.string("end_date"),
        })
        .filter(|entry| entry.institution.is_some() || entry.degree.is_some())
        .collect()
}
