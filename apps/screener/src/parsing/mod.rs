//! Structured extraction: free text in, schema-checked record out.
//!
//! Both CVs and the job description go through `StructuredParser`: build the
//! fixed instruction, call the `CompletionService`, locate the JSON object in
//! the reply, normalize keys, coerce fields. A malformed reply is re-prompted
//! with a stricter instruction according to `ParseRetryPolicy`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::warn;

use crate::llm_client::prompts::STRICT_RETRY_PREFIX;
use crate::llm_client::{CompletionService, LlmError};
use crate::models::profile::{CandidateProfile, RequirementSet};

pub mod fields;
pub mod json_scan;
pub mod profile;
pub mod prompts;
pub mod requirements;

use fields::FieldMap;

const RESPONSE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Structured-extraction service failed: {0}")]
    Service(#[from] LlmError),

    #[error("Malformed response (no JSON object found): {0}")]
    MalformedResponse(String),

    #[error("Expected a {expected} record, got {actual}")]
    UnexpectedRecord {
        expected: SchemaKind,
        actual: SchemaKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    CandidateProfile,
    Requirements,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::CandidateProfile => f.write_str("candidate profile"),
            SchemaKind::Requirements => f.write_str("requirements"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructuredRecord {
    Profile(CandidateProfile),
    Requirements(RequirementSet),
}

impl StructuredRecord {
    pub fn kind(&self) -> SchemaKind {
        match self {
            StructuredRecord::Profile(_) => SchemaKind::CandidateProfile,
            StructuredRecord::Requirements(_) => SchemaKind::Requirements,
        }
    }
}

/// How many times a malformed reply is re-prompted, and the pause before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRetryPolicy {
    pub reprompts: u32,
    pub backoff: Duration,
}

impl Default for ParseRetryPolicy {
    fn default() -> Self {
        Self {
            reprompts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct StructuredParser {
    service: Arc<dyn CompletionService>,
    retry: ParseRetryPolicy,
}

impl StructuredParser {
    pub fn new(service: Arc<dyn CompletionService>, retry: ParseRetryPolicy) -> Self {
        Self { service, retry }
    }

    pub async fn parse(&self, text: &str, kind: SchemaKind) -> Result<StructuredRecord, ParseError> {
        let today = Utc::now().date_naive();
        self.parse_as_of(text, kind, today).await
    }

    /// `parse` with an explicit "today" for the date-relative instructions.
    pub async fn parse_as_of(
        &self,
        text: &str,
        kind: SchemaKind,
        today: NaiveDate,
    ) -> Result<StructuredRecord, ParseError> {
        match kind {
            SchemaKind::CandidateProfile => {
                let prompt = profile::build_prompt(text, today);
                let fields = self
                    .request_fields(&prompt, prompts::CV_PARSE_SYSTEM, profile::ALIASES)
                    .await?;
                Ok(StructuredRecord::Profile(profile::profile_from_fields(&fields)))
            }
            SchemaKind::Requirements => {
                let prompt = requirements::build_prompt(text, today);
                let fields = self
                    .request_fields(&prompt, prompts::JD_PARSE_SYSTEM, requirements::ALIASES)
                    .await?;
                Ok(StructuredRecord::Requirements(
                    requirements::requirements_from_fields(&fields),
                ))
            }
        }
    }

    async fn request_fields(
        &self,
        prompt: &str,
        system: &str,
        aliases: &[(&str, &str)],
    ) -> Result<FieldMap, ParseError> {
        let mut reprompts = 0;
        let mut current = prompt.to_string();

        loop {
            let response = self.service.complete(&current, system).await?;

            if let Some(object) = json_scan::first_object(&response) {
                return Ok(FieldMap::from_object(object, aliases));
            }

            if reprompts >= self.retry.reprompts {
                return Err(ParseError::MalformedResponse(preview(&response)));
            }

            reprompts += 1;
            warn!(
                "Model reply had no JSON object, re-prompting ({reprompts}/{})",
                self.retry.reprompts
            );
            tokio::time::sleep(self.retry.backoff).await;
            current = format!("{STRICT_RETRY_PREFIX}{prompt}");
        }
    }
}

/// First `limit` characters, on a char boundary.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn preview(response: &str) -> String {
    let head = truncate_chars(response.trim(), RESPONSE_PREVIEW_CHARS);
    if head.is_empty() {
        "<empty reply>".to_string()
    } else {
        head.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedService;
    use super::*;

    fn parser(service: Arc<ScriptedService>, reprompts: u32) -> StructuredParser {
        StructuredParser::new(
            service,
            ParseRetryPolicy {
                reprompts,
                backoff: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_malformed_then_valid_is_reprompted_once() {
        let service = Arc::new(ScriptedService::replying(&[
            "I am sorry, I cannot do that.",
            r#"{"first_name": "Jane"}"#,
        ]));
        let record = parser(service.clone(), 1)
            .parse("Jane Doe", SchemaKind::CandidateProfile)
            .await
            .unwrap();

        match record {
            StructuredRecord::Profile(p) => assert_eq!(p.first_name.as_deref(), Some("Jane")),
            other => panic!("unexpected record {other:?}"),
        }
        let prompts = service.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].starts_with(STRICT_RETRY_PREFIX));
    }

    #[tokio::test]
    async fn test_malformed_without_reprompt_fails() {
        let service = Arc::new(ScriptedService::replying(&["not json", r#"{"a": 1}"#]));
        let err = parser(service.clone(), 0)
            .parse("text", SchemaKind::Requirements)
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedResponse(ref m) if m == "not json"));
        assert_eq!(service.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_refusal_ending_in_brace_is_malformed() {
        let refusal = "Sorry, I could not find any candidate data in the text {";
        let service = Arc::new(ScriptedService::replying(&[refusal, refusal]));
        let err = parser(service.clone(), 1)
            .parse("Jane Doe", SchemaKind::CandidateProfile)
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedResponse(_)), "got {err:?}");
        assert_eq!(service.prompt_count(), 2);
    }

    #[tokio::test]
    async fn test_non_object_json_is_malformed() {
        let service = Arc::new(ScriptedService::replying(&[r#"["Python", "SQL"]"#]));
        let err = parser(service, 0)
            .parse("text", SchemaKind::Requirements)
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_service_errors_are_not_reprompted() {
        let service = Arc::new(ScriptedService::new(vec![Err(LlmError::Api {
            status: 401,
            message: "bad key".to_string(),
        })]));
        let err = parser(service.clone(), 3)
            .parse("text", SchemaKind::CandidateProfile)
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::Service(LlmError::Api { status: 401, .. })));
        assert_eq!(service.prompt_count(), 1);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
