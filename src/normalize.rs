//! # Field Normalization Module
//!
//! ## Purpose
//! Pure normalization helpers applied to raw metadata cells: list-valued
//! fields arrive as JSON arrays, joined strings, or nothing at all, and must
//! come out as sequences of trimmed, non-empty strings. Also houses the
//! title → petitioner/respondent extraction and the embedded-year token scan
//! used for candidate-year ordering.
//!
//! ## Input/Output Specification
//! - **Input**: Raw JSON cells and human-entered strings
//! - **Output**: Normalized string lists and derived fields
//! - **Guarantees**: normalizing a list input is an identity transform after
//!   trimming; null/absent input yields an empty list

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn judge_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[,;]|\band\b").unwrap())
}

fn list_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,;]").unwrap())
}

fn year_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap())
}

fn edge_trim_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\W+|\W+$").unwrap())
}

/// Title separator patterns, tried in order; first match wins
fn title_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^(.+?)\s+vs\.?\s+(.+)$",
            r"(?i)^(.+?)\s+versus\s+(.+)$",
            r"(?i)^(.+?)\s+v\.\s+(.+)$",
            r"(?i)^(.+?)\s+&\s+(.+?)\s+vs\.?\s+(.+)$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn split_with(re: &Regex, raw: &str) -> Vec<String> {
    re.split(raw)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize a generic list-valued cell (petitioner, respondent,
/// available_languages, author_judge) into trimmed, non-empty strings.
///
/// Accepts a JSON array, a comma/semicolon-joined string, or null/absent.
pub fn normalize_list_field(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Vec::new();
            }
            split_with(list_split_re(), s)
        }
        _ => Vec::new(),
    }
}

/// Normalize a judge cell, which may additionally be "and"-joined
/// ("A, B and C" becomes ["A", "B", "C"]).
pub fn normalize_judges(value: &Value) -> Vec<String> {
    match value {
        Value::Array(_) => normalize_list_field(value),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Vec::new();
            }
            split_with(judge_split_re(), s)
        }
        _ => Vec::new(),
    }
}

/// Drop citation fragments of three characters or fewer (separator debris
/// like reporter abbreviations split mid-citation). Applied only in the
/// combined dataset's global normalization pass; per-case lookups keep the
/// fragments as the catalog records them.
pub fn filter_citation_fragments(citations: Vec<String>) -> Vec<String> {
    citations
        .into_iter()
        .filter(|c| c.trim().len() > 3)
        .collect()
}

/// Derive (petitioners, respondents) from a case title.
///
/// The separator patterns are tried in order; the first group of the first
/// matching pattern names the petitioner, the last group the respondent.
/// Captured parts are stripped of leading/trailing non-word characters and
/// title-cased; parts shorter than three characters are discarded.
pub fn extract_parties(title: &str) -> (Vec<String>, Vec<String>) {
    let title = title.trim();
    if title.is_empty() {
        return (Vec::new(), Vec::new());
    }

    for pattern in title_patterns() {
        if let Some(caps) = pattern.captures(title) {
            let petitioner_raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let respondent_raw = caps
                .get(caps.len() - 1)
                .map(|m| m.as_str())
                .unwrap_or_default();

            let petitioner = clean_party(petitioner_raw);
            let respondent = clean_party(respondent_raw);

            let petitioners = petitioner.into_iter().collect();
            let respondents = respondent.into_iter().collect();
            return (petitioners, respondents);
        }
    }

    (Vec::new(), Vec::new())
}

fn clean_party(raw: &str) -> Option<String> {
    let trimmed = edge_trim_re().replace_all(raw.trim(), "").to_string();
    if trimmed.len() > 2 {
        Some(title_case(&trimmed))
    } else {
        None
    }
}

/// Capitalize the first letter of each whitespace-separated word
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find a plausible 4-digit year token embedded in a case identifier.
///
/// Case identifiers often carry their true year (e.g. "2025 INSC 1401"), which
/// takes precedence over the caller-supplied year during resolution. Only
/// tokens inside [1950, max_year] qualify.
pub fn embedded_year(case_id: &str, max_year: u16) -> Option<u16> {
    for token in year_token_re().find_iter(case_id) {
        if let Ok(year) = token.as_str().parse::<u16>() {
            if (1950..=max_year).contains(&year) {
                return Some(year);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_judges_and_joined() {
        let value = json!("A, B and C");
        assert_eq!(normalize_judges(&value), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_judges_list_identity_after_trim() {
        let value = json!(["  K. Iyer ", "P. Bhagwati"]);
        assert_eq!(normalize_judges(&value), vec!["K. Iyer", "P. Bhagwati"]);
    }

    #[test]
    fn test_judges_null_and_empty() {
        assert!(normalize_judges(&Value::Null).is_empty());
        assert!(normalize_judges(&json!("   ")).is_empty());
        assert!(normalize_judges(&json!(42)).is_empty());
    }

    #[test]
    fn test_list_field_joined_string() {
        let value = json!("X; Y, Z");
        assert_eq!(normalize_list_field(&value), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_citation_fragment_filter() {
        let split = normalize_list_field(&json!("1975 AIR 1378, SCR, 1975 SCC (3) 946"));
        assert_eq!(split, vec!["1975 AIR 1378", "SCR", "1975 SCC (3) 946"]);
        assert_eq!(
            filter_citation_fragments(split),
            vec!["1975 AIR 1378", "1975 SCC (3) 946"]
        );
    }

    #[test]
    fn test_extract_parties_vs() {
        let (p, r) = extract_parties("KESAVANANDA BHARATI vs STATE OF KERALA");
        assert_eq!(p, vec!["Kesavananda Bharati"]);
        assert_eq!(r, vec!["State Of Kerala"]);
    }

    #[test]
    fn test_extract_parties_versus_and_v_dot() {
        let (p, r) = extract_parties("Maneka Gandhi versus Union of India");
        assert_eq!(p, vec!["Maneka Gandhi"]);
        assert_eq!(r, vec!["Union Of India"]);

        let (p, r) = extract_parties("Golaknath v. State of Punjab");
        assert_eq!(p, vec!["Golaknath"]);
        assert_eq!(r, vec!["State Of Punjab"]);
    }

    #[test]
    fn test_extract_parties_no_separator() {
        let (p, r) = extract_parties("In Re: Special Reference");
        assert!(p.is_empty());
        assert!(r.is_empty());
    }

    #[test]
    fn test_extract_parties_trims_punctuation() {
        let (p, r) = extract_parties("M/S. ABC LTD. vs. THE STATE,");
        assert_eq!(p, vec!["M/s. Abc Ltd"]);
        assert_eq!(r, vec!["The State"]);
    }

    #[test]
    fn test_embedded_year_in_range() {
        assert_eq!(embedded_year("2025 INSC 1401", 2026), Some(2025));
        assert_eq!(embedded_year("Appeal 1975/441", 2026), Some(1975));
    }

    #[test]
    fn test_embedded_year_rejects_out_of_range() {
        // 1401 is not a year token; 1949 predates the partition range
        assert_eq!(embedded_year("INSC 1401", 2026), None);
        assert_eq!(embedded_year("1949 case", 2026), None);
        assert_eq!(embedded_year("2030 case", 2026), None);
    }

    #[test]
    fn test_embedded_year_ignores_longer_digit_runs() {
        assert_eq!(embedded_year("id 120251", 2026), None);
    }
}
