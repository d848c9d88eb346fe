use crate::evidence::gather_evidence;
use crate::extractor::extract_verdict;
use crate::llm::Llm;
use crate::planner::plan_queries;
use crate::serper::Searcher;
use crate::types::{Claim, Conversation, Verdict};
use anyhow::Result;
use std::sync::Arc;

/// Full pipeline re-runs before the fallback verdict is served.
pub const MAX_ATTEMPTS: u32 = 3;

const SYSTEM_MESSAGE: &str = "You are an expert in TV shows and their plots. Your task is to \
evaluate a guess about a TV show plot and provide feedback on its accuracy, events' time in the \
show, your confidence level, and an explanation. Leave the time empty if the guess is incorrect. \
A guess is correct even if it is not 100% accurate, as long as it captures the main events and \
themes of the plot. If the event in the guess occurs even once in the show, it is considered \
correct, even if it is not the final resolution of the plot.";

/// Evaluation engine: the reasoning-engine and search-provider handles plus
/// tuning knobs, injected once at startup and shared across requests.
#[derive(Clone)]
pub struct Engine {
    pub llm: Arc<dyn Llm>,
    pub search: Arc<dyn Searcher>,
    pub search_concurrency: usize,
}

impl Engine {
    /// Evaluate one claim. Never fails from the caller's viewpoint: every
    /// error path inside the pipeline is retried up to [`MAX_ATTEMPTS`]
    /// times and then absorbed into the fixed fallback verdict.
    pub async fn evaluate(&self, show_name: &str, guess: &str) -> Verdict {
        let claim = Claim { show_name: show_name.to_string(), guess: guess.to_string() };
        for attempt in 1..=MAX_ATTEMPTS {
            match self.run_pipeline(&claim).await {
                Ok(verdict) => return verdict,
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "evaluation attempt failed");
                }
            }
        }
        tracing::error!(show_name, "all evaluation attempts failed, serving fallback verdict");
        Verdict::fallback()
    }

    /// One linear pass: fresh conversation, plan queries, gather evidence,
    /// extract the verdict. Any stage error aborts the whole pass.
    async fn run_pipeline(&self, claim: &Claim) -> Result<Verdict> {
        let mut conv = Conversation::new(
            claim,
            SYSTEM_MESSAGE,
            format!("TV Show Name: {}\nGuess: {}", claim.show_name, claim.guess),
        );

        let queries = plan_queries(self.llm.as_ref(), &claim.show_name, &claim.guess).await?;
        gather_evidence(self.search.as_ref(), &mut conv, &queries, self.search_concurrency)
            .await?;
        extract_verdict(self.llm.as_ref(), &mut conv).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serper::SearchHit;
    use crate::types::FALLBACK_EXPLANATION;
    use anyhow::{bail, Result};
    use async_openai::types::ChatCompletionRequestMessage;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct AlwaysFails {
        calls: AtomicU32,
    }
    #[async_trait::async_trait]
    impl Llm for AlwaysFails {
        async fn chat(&self, _m: Vec<ChatCompletionRequestMessage>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            bail!("step budget exceeded")
        }
        async fn chat_verdict(&self, _m: Vec<ChatCompletionRequestMessage>) -> Result<String> {
            bail!("step budget exceeded")
        }
    }

    struct HappyPath {
        pipeline_runs: AtomicU32,
    }
    #[async_trait::async_trait]
    impl Llm for HappyPath {
        async fn chat(&self, _m: Vec<ChatCompletionRequestMessage>) -> Result<String> {
            self.pipeline_runs.fetch_add(1, Ordering::SeqCst);
            Ok("House Cuddy finale\nHouse Cuddy relationship".to_string())
        }
        async fn chat_verdict(&self, _m: Vec<ChatCompletionRequestMessage>) -> Result<String> {
            Ok(r#"{"is_correct":true,"accuracy":0.8,"time":"season 7","explanation":"They date during season 7.","confidence":0.9}"#.to_string())
        }
    }

    struct StubSearch;
    #[async_trait::async_trait]
    impl Searcher for StubSearch {
        async fn search(&self, _q: &str) -> Result<Vec<SearchHit>> {
            Ok(vec![SearchHit { title: "Huddy".into(), body: "House and Cuddy dated.".into() }])
        }
    }

    #[tokio::test]
    async fn retry_exhaustion_yields_fallback_after_three_attempts() {
        let llm = Arc::new(AlwaysFails { calls: AtomicU32::new(0) });
        let engine = Engine { llm: llm.clone(), search: Arc::new(StubSearch), search_concurrency: 4 };

        let v = engine.evaluate("House", "anything").await;

        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
        assert!(!v.is_correct);
        assert_eq!(v.accuracy, 0.0);
        assert_eq!(v.time, None);
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.explanation, FALLBACK_EXPLANATION);
    }

    #[tokio::test]
    async fn successful_evaluation_runs_exactly_one_pass() {
        let llm = Arc::new(HappyPath { pipeline_runs: AtomicU32::new(0) });
        let engine = Engine { llm: llm.clone(), search: Arc::new(StubSearch), search_concurrency: 4 };

        let v = engine.evaluate("House", "House and Cuddy end up together").await;

        assert_eq!(llm.pipeline_runs.load(Ordering::SeqCst), 1);
        assert!(v.is_correct);
        assert_eq!(v.accuracy, 0.8);
        assert_eq!(v.time.as_deref(), Some("season 7"));
        assert_eq!(v.confidence, 0.9);
    }
}
