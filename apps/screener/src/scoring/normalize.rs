//! Term normalization shared by every scoring dimension.

use std::collections::BTreeSet;

/// Common spellings → one canonical form. Keys are already normalized.
const TERM_ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("golang", "go"),
    ("postgres", "postgresql"),
    ("psql", "postgresql"),
    ("mssql", "sql server"),
    ("ms sql", "sql server"),
    ("k8s", "kubernetes"),
    ("node", "node.js"),
    ("nodejs", "node.js"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("vuejs", "vue"),
    ("vue.js", "vue"),
    ("ml", "machine learning"),
    ("ai", "artificial intelligence"),
    ("nlp", "natural language processing"),
    ("amazon web services", "aws"),
    ("gcp", "google cloud"),
    ("google cloud platform", "google cloud"),
    ("ms excel", "excel"),
    ("microsoft excel", "excel"),
    ("c sharp", "c#"),
    ("cpp", "c++"),
];

/// Lowercase, separators to spaces, whitespace collapsed, then aliased.
/// `"  React.JS "` → `"react"`, `"Machine-Learning"` → `"machine learning"`.
pub fn normalize_term(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| match c {
            '-' | '_' | '/' | ',' | '(' | ')' | ':' | ';' => ' ',
            other => other,
        })
        .collect();
    let collapsed = spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_string();

    TERM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == collapsed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(collapsed)
}

/// Word tokens of a normalized term, each token aliased on its own.
fn tokens(normalized: &str) -> BTreeSet<String> {
    normalized
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(normalize_term)
        .collect()
}

/// How well `candidate` covers `required`: 1.0 for the same normalized term,
/// 0.5 when one term's tokens are all contained in the other's, else 0.
pub fn term_match(required: &str, candidate: &str) -> f64 {
    let required = normalize_term(required);
    let candidate = normalize_term(candidate);
    if required.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if required == candidate {
        return 1.0;
    }

    let req_tokens = tokens(&required);
    let cand_tokens = tokens(&candidate);
    if req_tokens.is_subset(&cand_tokens) || cand_tokens.is_subset(&req_tokens) {
        0.5
    } else {
        0.0
    }
}

/// Best match for `required` among `candidates`, with the candidate that produced it.
pub fn best_match<'a>(required: &str, candidates: &'a [String]) -> Option<(f64, &'a str)> {
    candidates
        .iter()
        .map(|c| (term_match(required, c), c.as_str()))
        .filter(|(strength, _)| *strength > 0.0)
        // First candidate wins ties.
        .fold(None, |best, (strength, c)| match best {
            Some((s, _)) if s >= strength => best,
            _ => Some((strength, c)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  Python "), "python");
        assert_eq!(normalize_term("Machine-Learning"), "machine learning");
        assert_eq!(normalize_term("React.JS"), "react");
        assert_eq!(normalize_term("JS"), "javascript");
        assert_eq!(normalize_term("Postgres"), "postgresql");
        assert_eq!(normalize_term("C++"), "c++");
        assert_eq!(normalize_term("Excel."), "excel");
    }

    #[test]
    fn test_term_match_levels() {
        assert_eq!(term_match("PostgreSQL", "postgres"), 1.0);
        assert_eq!(term_match("js", "JavaScript"), 1.0);
        assert_eq!(term_match("SQL", "SQL Server"), 0.5);
        assert_eq!(term_match("Machine Learning Engineering", "ML"), 0.5);
        assert_eq!(term_match("Python", "Java"), 0.0);
        assert_eq!(term_match("", "Java"), 0.0);
    }

    #[test]
    fn test_best_match_prefers_exact() {
        let skills = vec!["SQL Server".to_string(), "sql".to_string()];
        assert_eq!(best_match("SQL", &skills), Some((1.0, "sql")));
        assert_eq!(best_match("Rust", &skills), None);
    }
}
