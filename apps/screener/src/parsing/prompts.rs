// All LLM prompt constants for structured extraction.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for CV parsing.
pub const CV_PARSE_SYSTEM: &str = "You are an expert HR parser. \
    You extract candidate data from CVs exactly as written. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// CV parsing prompt template.
/// Replace `{today}`, `{emails}`, `{phones}`, `{no_guessing}` and `{cv_text}` before sending.
pub const CV_PARSE_PROMPT_TEMPLATE: &str = r#"Extract structured JSON from this CV text.

{no_guessing}

Emails found in the text: {emails}
Phone numbers found in the text: {phones}
Use these as hints only. Do NOT add contact details that are not in the text.

If a job, education entry or certification ends in "present", use today's date ({today})
to compute durations. Only set years_experience if the CV states it or the dated work
history makes it explicit.

Return a JSON object with this EXACT schema:
{
  "first_name": "string",
  "last_name": "string",
  "email": "string" | null,
  "phone": "string" | null,
  "skills": ["string"],
  "years_experience": number | null,
  "companies": ["string"],
  "languages": ["string"],
  "certifications": ["string"],
  "education": [
    {"institution": "string", "degree": "string", "start_date": "string", "end_date": "string" | null}
  ]
}

CV TEXT:
"""{cv_text}""""#;

/// System prompt for job description parsing.
pub const JD_PARSE_SYSTEM: &str = "You are an expert job description analyst. \
    You extract hiring requirements exactly as written. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Job description parsing prompt template.
/// Replace `{today}`, `{no_guessing}` and `{jd_text}` before sending.
pub const JD_PARSE_PROMPT_TEMPLATE: &str = r#"Extract the hiring requirements from the job description below.

{no_guessing}
Do NOT add requirements that are not explicitly mentioned.
Use today's date ({today}) wherever "present" or ongoing durations appear.

Return a JSON object with this EXACT schema:
{
  "skills_required": ["string"],
  "skills_preferred": ["string"],
  "education_required": "high school" | "associate" | "bachelor" | "master" | "doctorate" | null,
  "years_required": number | null,
  "languages_required": ["string"],
  "certifications_required": ["string"],
  "companies_preferred": ["string"]
}

Rules:
- skills_required: explicit must-haves ("required", "must have", "you need").
- skills_preferred: nice-to-haves ("preferred", "bonus", "nice to have", "a plus").
- years_required: the minimum number of years, e.g. "3+ years" -> 3.

JOB DESCRIPTION:
"""{jd_text}""""#;
