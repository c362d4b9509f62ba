// Prompts for the model-based fit scorer.

pub const FIT_SCORE_SYSTEM: &str = "You are an expert HR scorer. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

/// Replace `{today}`, `{candidate_json}` and `{requirements_json}` before sending.
pub const FIT_SCORE_PROMPT_TEMPLATE: &str = r#"You are a strict HR assistant.
Given a candidate and a set of job requirements, compute a relevance score from 0 to 100.
Base the score only on data explicitly present in the two JSON documents below.
Consider partial matches and synonyms, not only exact string matches.
Use today's date ({today}) wherever "present" or ongoing durations appear.

Candidate JSON: {candidate_json}
Requirements JSON: {requirements_json}

Return JSON with exactly these fields: {"score": number, "matching_points": ["string"]}

Guidelines:
1. Skills matching is the most important factor; partial matches count.
2. Education influences the score after skills.
3. Years of experience influence the score proportionally, only if explicitly stated.
4. Consider languages, certifications and companies only if present.
5. matching_points lists the strongest reasons this candidate fits. Do NOT add achievements or experience that are not in the candidate JSON.
6. Return ONLY JSON."#;
