// Shared prompt fragments.
// Each component that calls the model defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments.

/// Instruction that forbids inventing data. Appended to every extraction prompt.
pub const NO_GUESSING_INSTRUCTION: &str = "\
    CRITICAL: Extract information exactly as written. Do NOT assume, infer, \
    or exaggerate anything. If a field is not present in the text, use null \
    or an empty array. Do NOT guess.";

/// Prepended to a prompt when the previous response could not be parsed.
pub const STRICT_RETRY_PREFIX: &str = "\
    Your previous answer was not a single valid JSON object. \
    Answer again with ONE JSON object that starts with '{' and ends with '}'. \
    No prose, no code fences, no comments, no trailing commas.\n\n";
