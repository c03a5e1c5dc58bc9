// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant supporting a \
    professional job interview. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for free-text question drafting.
pub const QUESTION_ONLY_SYSTEM: &str = "You are an expert interviewer drafting a single \
    interview question. Respond with the question text only: no preamble, no numbering, \
    no quotation marks, no explanation.";

/// Instruction appended to prompts that receive résumé or job-description context.
pub const GROUNDING_INSTRUCTION: &str = "\
    Use ONLY the information present in the provided job description and résumé context. \
    Do NOT invent employers, dates, titles, or technologies that are not in the context.";

/// Replaces `{key}` placeholders in a template in one pass. Substituted
/// values are copied verbatim and never scanned for placeholders.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substitution = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (close, *value))
        });
        match substitution {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let out = render("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and x then y");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let out = render("{known} {unknown}", &[("known", "k")]);
        assert_eq!(out, "k {unknown}");
    }

    #[test]
    fn test_render_keeps_placeholders_inside_values_literal() {
        let out = render(
            "History: {history}\nContext: {jd}",
            &[("history", "User: {jd} please"), ("jd", "Kafka")],
        );
        assert_eq!(out, "History: User: {jd} please\nContext: Kafka");
    }

    #[test]
    fn test_render_leaves_json_braces_alone() {
        let out = render("{\n  \"decision\": \"{d}\"\n}", &[("d", "DEEPEN")]);
        assert_eq!(out, "{\n  \"decision\": \"DEEPEN\"\n}");
    }
}
