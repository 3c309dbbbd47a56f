//! Structured field extraction from free-text questions
//!
//! Each field is driven by an ordered pattern table evaluated top to
//! bottom with early exit: an earlier pattern always wins over a later
//! one even if both would match. Extraction never fails; absent cues
//! simply leave fields unset.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Gender cue extracted from the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Read-only projection of a question string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub original_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub procedure: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources.iter().map(|p| Regex::new(p).unwrap()).collect()
}

// Age shorthand like "46M" / "32F", spelled-out years, "age: N"
static AGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(\d+)(?:m|f|male|female)",
        r"(\d+)\s*(?:years?\s*old|yr|yrs)",
        r"(\d+)[-\s]*year[-\s]*old",
        r"age\s*:?\s*(\d+)",
        r"(\d+)\s*(?:male|female)",
    ])
});

static MALE_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| patterns(&[r"\b\d+m\b", r"\bmale\b"]));

static FEMALE_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| patterns(&[r"\b\d+f\b", r"\bfemale\b"]));

/// Fixed procedure vocabulary; matching is substring membership and all
/// hits are kept, not just the first
const PROCEDURE_KEYWORDS: &[&str] = &[
    "surgery",
    "operation",
    "procedure",
    "treatment",
    "therapy",
    "knee",
    "hip",
    "heart",
    "cardiac",
    "bypass",
    "transplant",
    "hospitalization",
    "admission",
    "consultation",
    "diagnostic",
    "mri",
    "ct scan",
    "x-ray",
    "blood test",
    "biopsy",
];

// Closed city list first; generic "in X" / "at X" as fallback
static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"\b(mumbai|delhi|bangalore|chennai|kolkata|pune|hyderabad|ahmedabad|surat|jaipur)\b",
        r"\bin\s+([a-zA-Z]+)",
        r"\bat\s+([a-zA-Z]+)",
    ])
});

static DURATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(\d+)[-\s]*months?\s*policy",
        r"(\d+)[-\s]*years?\s*policy",
        r"policy\s*(?:of|for)\s*(\d+)\s*(?:month|year)",
    ])
});

static AMOUNT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"₹\s*(\d+(?:,\d+)*(?:\.\d+)?)",
        r"rs\.?\s*(\d+(?:,\d+)*(?:\.\d+)?)",
        r"rupees\s*(\d+(?:,\d+)*(?:\.\d+)?)",
        r"(\d+(?:,\d+)*(?:\.\d+)?)\s*(?:rupees|rs)",
    ])
});

fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<regex::Captures<'t>> {
    patterns.iter().find_map(|pattern| pattern.captures(text))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Extract structured fields from a free-text question.
///
/// Never fails; every field defaults to unset.
pub fn parse_query_structure(query: &str) -> StructuredQuery {
    let lower = query.to_lowercase();

    let age = first_capture(&AGE_PATTERNS, &lower)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    let gender = if MALE_PATTERNS.iter().any(|p| p.is_match(&lower)) {
        Some(Gender::Male)
    } else if FEMALE_PATTERNS.iter().any(|p| p.is_match(&lower)) {
        Some(Gender::Female)
    } else {
        None
    };

    let procedure: Vec<String> = PROCEDURE_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect();

    let location = first_capture(&LOCATION_PATTERNS, &lower)
        .and_then(|c| c.get(1).map(|m| title_case(m.as_str())));

    let policy_duration = first_capture(&DURATION_PATTERNS, &lower).and_then(|c| {
        let value: u32 = c.get(1)?.as_str().parse().ok()?;
        let unit = if c.get(0)?.as_str().contains("month") {
            "months"
        } else {
            "years"
        };
        Some(format!("{} {}", value, unit))
    });

    let amount = first_capture(&AMOUNT_PATTERNS, &lower)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok());

    StructuredQuery {
        original_query: query.to_string(),
        age,
        gender,
        procedure,
        location,
        policy_duration,
        amount,
    }
}

/// Per-keyword synonym expansions injected into the enhanced search string
const MEDICAL_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "knee",
        &["orthopedic", "joint replacement", "arthroscopy", "ligament"],
    ),
    (
        "heart",
        &["cardiac", "cardiovascular", "coronary", "bypass"],
    ),
    (
        "surgery",
        &["surgical procedure", "operation", "medical treatment"],
    ),
    (
        "hospitalization",
        &["inpatient", "admission", "hospital stay"],
    ),
];

/// Generic policy-decision vocabulary appended to every enhanced query
const COVERAGE_TERMS: &[&str] = &[
    "coverage",
    "covered",
    "eligible",
    "claim",
    "benefit",
    "exclusion",
    "limitation",
    "pre-existing",
    "waiting period",
];

/// Synthesize an enhanced search string biased toward policy-decision
/// language: original query, detected procedures plus their synonyms,
/// age-banded terms, duration terms, and the constant coverage tail.
pub fn enhance_search_query(structured: &StructuredQuery) -> String {
    let mut terms: Vec<String> = vec![structured.original_query.clone()];

    if !structured.procedure.is_empty() {
        terms.extend(structured.procedure.iter().cloned());
        for proc in &structured.procedure {
            if let Some((_, synonyms)) = MEDICAL_SYNONYMS.iter().find(|(k, _)| *k == proc.as_str()) {
                terms.extend(synonyms.iter().map(|s| s.to_string()));
            }
        }
    }

    if let Some(age) = structured.age {
        if age >= 60 {
            terms.extend(["senior citizen", "elderly", "age limit"].map(String::from));
        } else if age < 18 {
            terms.extend(["minor", "child", "pediatric"].map(String::from));
        }
    }

    if structured.policy_duration.is_some() {
        terms.extend(["waiting period", "policy term", "coverage period"].map(String::from));
    }

    terms.extend(COVERAGE_TERMS.iter().map(|s| s.to_string()));

    terms.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_query() {
        let structured = parse_query_structure("46M knee surgery in Pune");
        assert_eq!(structured.age, Some(46));
        assert_eq!(structured.gender, Some(Gender::Male));
        assert!(structured.procedure.contains(&"knee".to_string()));
        assert!(structured.procedure.contains(&"surgery".to_string()));
        assert_eq!(structured.location.as_deref(), Some("Pune"));
    }

    #[test]
    fn test_female_shorthand() {
        let structured = parse_query_structure("32F hip replacement");
        assert_eq!(structured.age, Some(32));
        assert_eq!(structured.gender, Some(Gender::Female));
        assert!(structured.procedure.contains(&"hip".to_string()));
    }

    #[test]
    fn test_spelled_out_age() {
        let structured = parse_query_structure("My father is 65 years old, is cataract covered?");
        assert_eq!(structured.age, Some(65));
        assert_eq!(structured.gender, None);
    }

    #[test]
    fn test_age_colon_form() {
        let structured = parse_query_structure("age: 30, consultation charges");
        assert_eq!(structured.age, Some(30));
    }

    #[test]
    fn test_no_gender_cue_leaves_unset() {
        let structured = parse_query_structure("Is knee surgery covered?");
        assert_eq!(structured.gender, None);
    }

    #[test]
    fn test_city_list_wins_over_generic_pattern() {
        // "in Mumbai" matches both the city list and the generic "in X";
        // the earlier pattern decides
        let structured = parse_query_structure("treatment in mumbai next month");
        assert_eq!(structured.location.as_deref(), Some("Mumbai"));
    }

    #[test]
    fn test_generic_location_fallback() {
        let structured = parse_query_structure("hospitalized in Nashik");
        assert_eq!(structured.location.as_deref(), Some("Nashik"));
    }

    #[test]
    fn test_duration_months() {
        let structured = parse_query_structure("3-month policy, knee surgery");
        assert_eq!(structured.policy_duration.as_deref(), Some("3 months"));
    }

    #[test]
    fn test_duration_years() {
        let structured = parse_query_structure("covered under a 2 year policy?");
        assert_eq!(structured.policy_duration.as_deref(), Some("2 years"));
    }

    #[test]
    fn test_amount_with_separators() {
        let structured = parse_query_structure("claim of ₹50,000 for surgery");
        assert_eq!(structured.amount, Some(50000.0));
    }

    #[test]
    fn test_amount_rs_prefix() {
        let structured = parse_query_structure("Rs. 12,500.50 consultation bill");
        assert_eq!(structured.amount, Some(12500.50));
    }

    #[test]
    fn test_all_fields_default_unset() {
        let structured = parse_query_structure("What is the grace period?");
        assert_eq!(structured.age, None);
        assert_eq!(structured.gender, None);
        assert!(structured.procedure.is_empty());
        assert_eq!(structured.location, None);
        assert_eq!(structured.policy_duration, None);
        assert_eq!(structured.amount, None);
    }

    #[test]
    fn test_enhance_includes_synonyms() {
        let structured = parse_query_structure("46M knee surgery in Pune");
        let enhanced = enhance_search_query(&structured);
        assert!(enhanced.starts_with("46M knee surgery in Pune"));
        assert!(enhanced.contains("orthopedic"));
        assert!(enhanced.contains("arthroscopy"));
        assert!(enhanced.contains("surgical procedure"));
    }

    #[test]
    fn test_enhance_age_bands() {
        let senior = parse_query_structure("68M cataract surgery");
        assert!(enhance_search_query(&senior).contains("senior citizen"));

        let minor = parse_query_structure("12M tonsil surgery");
        assert!(enhance_search_query(&minor).contains("pediatric"));

        let adult = parse_query_structure("30M knee surgery");
        let enhanced = enhance_search_query(&adult);
        assert!(!enhanced.contains("senior citizen"));
        assert!(!enhanced.contains("pediatric"));
    }

    #[test]
    fn test_enhance_duration_terms() {
        let structured = parse_query_structure("3-month policy knee surgery");
        assert!(enhance_search_query(&structured).contains("policy term"));
    }

    #[test]
    fn test_enhance_coverage_tail_always_present() {
        let structured = parse_query_structure("random question");
        let enhanced = enhance_search_query(&structured);
        assert!(enhanced.contains("exclusion"));
        assert!(enhanced.contains("waiting period"));
    }
}
