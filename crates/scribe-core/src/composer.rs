//! Turns retrieved chunks and the user's question into the model prompt.

use scribe_docs::RetrievalResult;
use scribe_llm::Message;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that answers questions based ONLY on the provided context.
If the provided context doesn't contain the information needed to answer the question, say \"I don't have enough information to answer that question.\"
Do not use any prior knowledge beyond what is provided in the context.
Always cite the source of your information from the provided context.
Respond in plain text without any Markdown formatting.";

/// Builds the system and user messages for one question.
#[derive(Debug, Clone)]
pub struct Composer {
    system_prompt: String,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_owned(),
        }
    }
}

impl Composer {
    /// Use `system_prompt` instead of the built-in instruction when given.
    #[must_use]
    pub fn new(system_prompt: Option<String>) -> Self {
        system_prompt.map_or_else(Self::default, |system_prompt| Self { system_prompt })
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    #[must_use]
    pub fn compose(&self, result: &RetrievalResult, query: &str) -> Vec<Message> {
        let context = render_context(result);
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user(format!(
                "Context information is below.\n\n{context}\n\nGiven the context information and not prior knowledge, answer the following question: {query}"
            )),
        ]
    }
}

/// Each chunk as `Source: <path>, Page: <n|unknown>` followed by its text,
/// separated by blank lines.
#[must_use]
pub fn render_context(result: &RetrievalResult) -> String {
    result
        .iter()
        .map(|scored| {
            let chunk = &scored.chunk;
            let page = chunk
                .page
                .map_or_else(|| "unknown".to_owned(), |p| p.to_string());
            format!("Source: {}, Page: {page}\n{}", chunk.source, chunk.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use scribe_docs::ScoredChunk;
    use scribe_docs::document::Chunk;
    use scribe_llm::Role;

    use super::*;

    fn scored(source: &str, page: Option<u32>, content: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                content: content.into(),
                source: source.into(),
                page,
                chunk_index: 0,
            },
            score: 1.0,
        }
    }

    #[test]
    fn context_lists_sources_in_order() {
        let result = vec![
            scored("manual.pdf", Some(3), "Reset the router."),
            scored("faq.txt", None, "Call support."),
        ];
        assert_eq!(
            render_context(&result),
            "Source: manual.pdf, Page: 3\nReset the router.\n\nSource: faq.txt, Page: unknown\nCall support."
        );
    }

    #[test]
    fn compose_builds_system_then_user() {
        let result = vec![scored("manual.pdf", Some(1), "VPN setup steps.")];
        let messages = Composer::default().compose(&result, "How do I set up the VPN?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Context information is below.\n\nSource: manual.pdf, Page: 1\nVPN setup steps.\n\n\
             Given the context information and not prior knowledge, answer the following question: \
             How do I set up the VPN?"
        );
    }

    #[test]
    fn empty_result_still_composes() {
        let messages = Composer::default().compose(&Vec::new(), "anything");
        assert!(
            messages[1]
                .content
                .starts_with("Context information is below.\n\n\n\n")
        );
    }

    #[test]
    fn custom_system_prompt_replaces_default() {
        let composer = Composer::new(Some("Be brief.".into()));
        let messages = composer.compose(&Vec::new(), "q");
        assert_eq!(messages[0].content, "Be brief.");
        assert_eq!(Composer::new(None).system_prompt(), SYSTEM_PROMPT);
    }
}
