use crate::llm::Llm;
use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};

const PLANNER_SYSTEM: &str = "You write web search queries. Given a TV show and a guess about its \
plot, produce exactly 5 short keyword-style queries (3-6 words each) that would surface evidence \
for or against the guess. One query per line. No question phrasing, no bullets, no numbering.";

/// Ask the engine for search queries covering the guess. The response is
/// split on newlines and blank lines are dropped; whatever count of
/// non-empty lines comes back is used as-is. The prompt asks for five but
/// the count is deliberately not enforced.
pub async fn plan_queries(llm: &dyn Llm, show_name: &str, guess: &str) -> Result<Vec<String>> {
    let sys = ChatCompletionRequestSystemMessageArgs::default()
        .content(PLANNER_SYSTEM)
        .build()
        .unwrap()
        .into();
    let usr = ChatCompletionRequestUserMessageArgs::default()
        .content(format!("TV Show Name: {show_name}\nGuess: {guess}"))
        .build()
        .unwrap()
        .into();

    let raw = llm.chat(vec![sys, usr]).await?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
