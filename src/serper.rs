use anyhow::Result;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

/// One web-search result: a page title and a text snippet.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    #[serde(rename = "snippet")]
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct SerperResp {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

/// Search-provider boundary: one short query in, ordered title/body hits
/// out, possibly empty.
#[async_trait::async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Serper-backed search client with a process-wide QPS cap.
pub struct Serper {
    http: Client,
    key: String,
    limiter: DefaultDirectRateLimiter,
    top_k: usize,
    safe_search: bool,
}

impl Serper {
    pub fn new(key: String, qps: u32, top_k: usize, safe_search: bool, timeout_ms: u64) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap();
        let qps = NonZeroU32::new(qps).unwrap_or(nonzero!(1u32));
        let limiter = RateLimiter::direct(Quota::per_second(qps));
        Self { http, key, limiter, top_k, safe_search }
    }
}

#[async_trait::async_trait]
impl Searcher for Serper {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.limiter.until_ready().await;
        tracing::debug!(query, "issuing web search");
        let resp = self
            .http
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", &self.key)
            .json(&serde_json::json!({
                "q": query,
                "num": self.top_k,
                "safe": if self.safe_search { "active" } else { "off" },
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<SerperResp>()
            .await?;
        Ok(resp.organic.into_iter().take(self.top_k).collect())
    }
}
