//! System instructions, prompt templates, and the fixed user-facing replies

/// Reply for utterances that hit the forbidden-term gate
pub const REFUSAL_MESSAGE: &str = "Sorry, I can't answer this question.";

/// Reply for greetings and pleasantries
pub const GREETING_MESSAGE: &str =
    "- Hello! I'm the virtual assistant for Kenmark ITan Solutions.\n- How can I help you today?";

/// Reply when the corpus has nothing relevant and no hosted model can help
pub const NO_KNOWLEDGE_LINES: [&str; 2] = [
    "I don't have that information yet in my knowledge base.",
    "Please contact us directly at info@kenmarkitan.com or visit our website for more details.",
];

/// Reply when the pipeline hit an unexpected fault
pub const APOLOGY_LINES: [&str; 2] = [
    "I'm having trouble processing your request right now.",
    "Please try again in a moment or contact us directly.",
];

/// Context block returned when retrieval produced nothing
pub const EMPTY_CONTEXT: &str = "No relevant information found in the knowledge base.";

/// Header line of an assembled grounding context
pub const CONTEXT_HEADER: &str =
    "Relevant information from Kenmark ITan Solutions knowledge base:";

/// System instruction for the local model, which receives grounding context
pub const LOCAL_SYSTEM_PROMPT: &str = r#"You are an AI assistant for Kenmark ITan Solutions, a technology company based in Mumbai, India.
Your role is to help users with information about the company, its services, and answer their questions.

Guidelines:
- Answer questions using ONLY the information provided in the context
- Be polite, professional, and concise
- Prefer clear bullet-pointed answers rather than long paragraphs whenever possible.
- If the information is not available in the context, politely say: "I don't have that information yet. Please contact us directly for more details."
- Do not make up or hallucinate information
- Focus on being helpful and accurate
- If asked about contact information, provide the details from the context
- If the user greets or makes small talk, respond briefly and professionally.
- If the user asks inappropriate, offensive, or vulgar questions, reply: "Sorry, I can't answer this question."

Always base your responses on the provided context."#;

/// System message for the hosted model
pub const HOSTED_SYSTEM_PROMPT: &str =
    "You are a concise, professional assistant. Prefer bullet points.";

/// Build the local-model prompt from a grounding context and the user query
#[must_use]
pub fn local_prompt(context: &str, query: &str) -> String {
    format!(
        "{context}\n\nUser Question: {query}\n\nAssistant Response (use bullet points where appropriate):"
    )
}

/// Build the self-contained hosted-model prompt for a raw user query
#[must_use]
pub fn hosted_prompt(query: &str) -> String {
    format!(
        r#"
You are an AI assistant for Kenmark ITan Solutions. Provide a concise, professional answer in bullet points.
- Keep it short and relevant.
- If the question is inappropriate or vulgar, reply: "Sorry, I can't answer this question."
- If you truly cannot answer, say: "I don't have that information yet."

User question: {query}
"#
    )
}

/// Render lines as a bullet list, one `- ` item per non-blank line
#[must_use]
pub fn bullets(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The bulleted "don't have that information yet" reply
#[must_use]
pub fn no_knowledge_reply() -> String {
    bullets(&NO_KNOWLEDGE_LINES)
}

/// The bulleted apology for unexpected faults
#[must_use]
pub fn apology_reply() -> String {
    bullets(&APOLOGY_LINES)
}
