//! Prompt construction and fixed reply texts.

use std::fmt::Write;

use super::SourceSnippet;

/// System instructions sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You are a customer support assistant. Answer using only the \
reference documents provided. If they do not cover the question, say so briefly and offer to \
connect the customer with a human agent. Reply in the customer's language.";

/// Reply used when the generation backend fails.
pub const DEGRADED_RESPONSE: &str = "抱歉，系统暂时繁忙，请稍后再试，或回复\"转人工\"联系人工客服。\
Sorry, our assistant is temporarily unavailable. Please try again shortly or ask for a human agent.";

/// Reply used when a query is handed to a human.
pub const TRANSFER_RESPONSE: &str = "正在为您转接人工客服，请稍候。\
Connecting you to a human agent, please hold on.";

/// Builds the user prompt: enumerated documents followed by the literal query.
pub fn build_prompt(query: &str, documents: &[SourceSnippet]) -> String {
    let mut prompt = String::new();
    if documents.is_empty() {
        prompt.push_str("Reference documents: none available.\n\n");
    } else {
        prompt.push_str("Reference documents:\n");
        for (i, doc) in documents.iter().enumerate() {
            // Writing into a String cannot fail.
            let _ = writeln!(prompt, "[{}] {}\n{}\n", i + 1, doc.title, doc.content);
        }
    }
    let _ = write!(prompt, "Customer question: {}", query);
    prompt
}
