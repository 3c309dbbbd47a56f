//! Deterministic prompt templates
//!
//! The rendered prompt fixes a two-part output contract with the model:
//! a single `ANSWER:` line followed by a `JSON:` marker and a decision
//! object. The response parser is built to tolerate deviations from the
//! contract; the builder's only job is to state it unambiguously.

use crate::query::{Gender, StructuredQuery};
use crate::types::Chunk;

/// Role-setting preamble shared by both modes
const PREAMBLE: &str =
    "You are an insurance policy assistant with expertise in claims processing and policy interpretation.";

/// Output instructions shared by both modes
const INSTRUCTIONS: &str = "INSTRUCTIONS:
1. First, provide a clear, direct answer to the user's question in one simple sentence
2. Then provide the detailed JSON response for analysis

Format your response exactly like this:

ANSWER: [Your direct answer here - e.g., \"Yes, knee surgery is covered under the policy.\" or \"No, this procedure is not covered.\"]

JSON:";

/// Response schema for retrieved-chunk prompts
const RETRIEVED_SCHEMA: &str = r#"{
  "decision": "Approved" or "Rejected",
  "amount": "₹Amount if applicable, else Not Applicable",
  "confidence": "High/Medium/Low based on available information",
  "summary": "Brief explanation of the decision",
  "justification": [
    {
      "clause": "exact text of the clause that supports your decision",
      "source": "filename.pdf",
      "page": 14,
      "relevance": "how this clause applies to the specific query"
    }
  ],
  "additional_requirements": [
    "Any additional documents or steps needed"
  ],
  "exclusions_checked": [
    "List of exclusions that were evaluated"
  ]
}"#;

/// Response schema for direct-context prompts; includes the
/// query-interpretation block the retrieved schema omits
const DIRECT_CONTEXT_SCHEMA: &str = r#"{
  "decision": "Approved" or "Rejected" or "Partial" or "Information",
  "amount": "₹Amount if applicable, else null",
  "confidence": "High/Medium/Low based on available information",
  "summary": "Brief explanation of the decision",
  "justification": [
    {
      "clause": "text from the context that supports your answer",
      "source": "email/attachment",
      "page": "N/A",
      "relevance": "how this information applies to the query"
    }
  ],
  "additional_requirements": [
    "Any additional documents or steps needed"
  ],
  "query_interpretation": {
    "understood_as": "How the system interpreted the query",
    "assumptions_made": ["Any assumptions made for incomplete information"]
  }
}"#;

/// Context payload the prompt is built around
#[derive(Debug, Clone)]
pub enum PromptMode {
    /// Chunks retrieved from the vector index
    Retrieved(Vec<Chunk>),
    /// Caller-supplied literal context (e.g. an email body)
    DirectContext(String),
}

/// Renders the full prompt for one question
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the prompt: preamble, structured-query block, verbatim
    /// question, context block, and the mode's output contract.
    pub fn build(question: &str, structured: &StructuredQuery, mode: &PromptMode) -> String {
        let structured_block = Self::render_structured(structured);

        let (context_header, context_text, schema) = match mode {
            PromptMode::Retrieved(chunks) => (
                "RELEVANT POLICY CLAUSES AND DOCUMENTS:",
                Self::render_chunks(chunks),
                RETRIEVED_SCHEMA,
            ),
            PromptMode::DirectContext(text) => (
                "CONTEXT FROM EMAIL AND ATTACHMENTS:",
                text.clone(),
                DIRECT_CONTEXT_SCHEMA,
            ),
        };

        format!(
            "{preamble}\n\n{structured}\nORIGINAL USER QUERY:\n\"{question}\"\n\n{header}\n{context}\n\n{instructions}\n{schema}",
            preamble = PREAMBLE,
            structured = structured_block,
            question = question,
            header = context_header,
            context = context_text,
            instructions = INSTRUCTIONS,
            schema = schema,
        )
    }

    /// Render the structured-query block; unset fields read
    /// "Not specified" rather than being omitted.
    fn render_structured(structured: &StructuredQuery) -> String {
        let age = structured
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "Not specified".to_string());
        let gender = match structured.gender {
            Some(Gender::Male) => "male".to_string(),
            Some(Gender::Female) => "female".to_string(),
            None => "Not specified".to_string(),
        };
        let procedure = if structured.procedure.is_empty() {
            "Not specified".to_string()
        } else {
            structured.procedure.join(", ")
        };
        let location = structured
            .location
            .clone()
            .unwrap_or_else(|| "Not specified".to_string());
        let duration = structured
            .policy_duration
            .clone()
            .unwrap_or_else(|| "Not specified".to_string());
        let amount = structured
            .amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| "Not specified".to_string());

        format!(
            "PARSED QUERY DETAILS:\n- Age: {}\n- Gender: {}\n- Procedure: {}\n- Location: {}\n- Policy Duration: {}\n- Amount: {}\n",
            age, gender, procedure, location, duration, amount
        )
    }

    /// Join retrieved chunks as source/page/content blocks
    fn render_chunks(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|chunk| {
                let page = chunk
                    .metadata
                    .page
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "?".to_string());
                format!(
                    "Source: {}, Page: {}\nContent:\n{}",
                    chunk.metadata.source, page, chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query_structure;

    #[test]
    fn test_retrieved_prompt_contains_all_blocks() {
        let question = "46M knee surgery in Pune, 3-month policy";
        let structured = parse_query_structure(question);
        let chunks = vec![Chunk::new("Knee surgery clause text.", "policy.pdf", Some(14))];

        let prompt = PromptBuilder::build(question, &structured, &PromptMode::Retrieved(chunks));

        assert!(prompt.contains("insurance policy assistant"));
        assert!(prompt.contains("- Age: 46"));
        assert!(prompt.contains("- Gender: male"));
        assert!(prompt.contains("- Policy Duration: 3 months"));
        assert!(prompt.contains(&format!("\"{}\"", question)));
        assert!(prompt.contains("Source: policy.pdf, Page: 14"));
        assert!(prompt.contains("Knee surgery clause text."));
        assert!(prompt.contains("ANSWER:"));
        assert!(prompt.contains("JSON:"));
        assert!(prompt.contains("exclusions_checked"));
        assert!(!prompt.contains("query_interpretation"));
    }

    #[test]
    fn test_unset_fields_render_not_specified() {
        let question = "What is the grace period?";
        let structured = parse_query_structure(question);
        let prompt =
            PromptBuilder::build(question, &structured, &PromptMode::Retrieved(Vec::new()));

        assert!(prompt.contains("- Age: Not specified"));
        assert!(prompt.contains("- Gender: Not specified"));
        assert!(prompt.contains("- Procedure: Not specified"));
        assert!(prompt.contains("- Location: Not specified"));
        assert!(prompt.contains("- Amount: Not specified"));
    }

    #[test]
    fn test_direct_context_prompt() {
        let question = "Is the attached claim payable?";
        let structured = parse_query_structure(question);
        let mode = PromptMode::DirectContext("Email body with claim details.".to_string());
        let prompt = PromptBuilder::build(question, &structured, &mode);

        assert!(prompt.contains("CONTEXT FROM EMAIL AND ATTACHMENTS:"));
        assert!(prompt.contains("Email body with claim details."));
        assert!(prompt.contains("query_interpretation"));
        assert!(!prompt.contains("exclusions_checked"));
    }

    #[test]
    fn test_chunk_without_page_renders_question_mark() {
        let question = "Is dental covered?";
        let structured = parse_query_structure(question);
        let chunks = vec![Chunk::new("Dental clause.", "email/attachment", None)];
        let prompt = PromptBuilder::build(question, &structured, &PromptMode::Retrieved(chunks));
        assert!(prompt.contains("Source: email/attachment, Page: ?"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let question = "46M knee surgery";
        let structured = parse_query_structure(question);
        let chunks = vec![Chunk::new("Clause.", "policy.pdf", Some(1))];
        let a = PromptBuilder::build(question, &structured, &PromptMode::Retrieved(chunks.clone()));
        let b = PromptBuilder::build(question, &structured, &PromptMode::Retrieved(chunks));
        assert_eq!(a, b);
    }
}
