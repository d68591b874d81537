
use std::fmt::Write as _;

use crate::mcp::Tool;

/// One `name: description` line per tool, in catalog order
#[inline]
pub fn render_tool_listing<'a, I>(tools: I) -> String
where
    I: IntoIterator<Item = &'a Tool>,
{
    let mut listing = String::new();
    for tool in tools {
        let _ = writeln!(
            listing,
            "{}: {}",
            tool.name,
            tool.description.as_deref().unwrap_or_default()
        );
    }
    listing
}

/// First prompt: ask the model to pick a tool and its arguments as bare JSON
#[inline]
pub fn tool_selection_prompt(tool_listing: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant with access to these tools:\n\
         \n\
         {listing}\n\
         Choose the appropriate tool based on the user's question.\n\
         Respond with a single JSON object of the form \
         {{\"tool\": \"<tool name>\", \"arguments\": {{\"<argument name>\": \"<value>\"}}}} \
         and nothing else. Do not wrap it in markdown or add any explanation.\n\
         \n\
         User question: {question}\n",
        listing = tool_listing.trim_end(),
        question = question.trim(),
    )
}

/// Second prompt: answer the question from the retrieved context
#[inline]
pub fn final_answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following context from the Tax Procedures Act to answer the question.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:",
        question = question.trim(),
    )
}
