//! LLM prompts for compliance judgments.

/// Collection of prompts used by the audit evaluator.
pub struct Prompts;

impl Prompts {
    /// System prompt sent with every judgment request.
    pub fn system_compliance_auditor() -> &'static str {
        "You are an expert auditor in regulatory compliance for AI systems. You judge documents strictly against the requirement you are given and always respond with valid JSON when requested."
    }

    /// Prompt to score one document against one requirement.
    ///
    /// Placeholders: `{document}`, `{requirement}`, `{references}`.
    pub fn compliance_judgment() -> &'static str {
        r#"Evaluate the compliance of the provided document against the specified requirement. Use the extracted regulatory references as additional context to interpret the requirement.

Document to evaluate:
{document}

Requirement to verify:
{requirement}

Relevant regulatory references (extracted from legal corpus):
{references}

Instructions:
- score: an integer from 0 to 5 (0 = no compliance, 5 = maximum compliance).
- auditor_notes: a concise note (max 100 words) explaining the evaluation, citing evidence from the document and references.
- If you cannot determine a score, return "N/A" as the score and explain in auditor_notes why no score could be assigned.

Respond exclusively in valid JSON format:
{
    "score": <integer from 0 to 5, or "N/A">,
    "auditor_notes": "<note text>"
}

Directly return the final JSON structure. Do not output anything else."#
    }

    /// Fill the judgment prompt for one requirement.
    pub fn build_compliance_judgment(document: &str, requirement: &str, references: &str) -> String {
        let references = if references.trim().is_empty() {
            "(no references retrieved)"
        } else {
            references
        };
        // Fill {document} last so placeholders inside the document are never expanded.
        Self::compliance_judgment()
            .replace("{requirement}", requirement)
            .replace("{references}", references)
            .replacen("{document}", document, 1)
    }
}
