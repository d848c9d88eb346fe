use crate::serper::Searcher;
use crate::types::Conversation;
use anyhow::Result;
use futures::{stream, StreamExt};

/// Returned verbatim when a query yields nothing.
pub const NO_RESULTS: &str = "No results found.";

/// Preamble of the synthetic user message that carries the accumulated
/// evidence into the engine's context.
pub const EVIDENCE_PREAMBLE: &str = "Here is some additional information...";

/// Run one query and flatten the hits to a compact digest, one line per
/// hit. Provider errors propagate to the retry envelope.
pub async fn retrieve_digest(search: &dyn Searcher, query: &str) -> Result<String> {
    let hits = search.search(query).await?;
    if hits.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }
    Ok(hits
        .iter()
        .map(|h| format!("- {}: {}", h.title, h.body))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Retrieve every planned query and fold the digests into the conversation's
/// evidence buffer, then attach the whole buffer as one user message.
///
/// Retrievals run concurrently but the buffer keeps the planning order:
/// results are re-sorted by query index before any text is appended.
pub async fn gather_evidence(
    search: &dyn Searcher,
    conv: &mut Conversation,
    queries: &[String],
    concurrency: usize,
) -> Result<()> {
    let tasks: Vec<_> = queries
        .iter()
        .enumerate()
        .map(|(idx, query)| async move {
            let digest = retrieve_digest(search, query).await;
            (idx, digest)
        })
        .collect();

    let mut results = stream::iter(tasks)
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;
    results.sort_by_key(|(idx, _)| *idx);

    for (idx, digest) in results {
        let digest = digest?;
        conv.evidence
            .push_str(&format!("\nSearch results for '{}':\n{}\n", queries[idx], digest));
    }

    let msg = format!("{EVIDENCE_PREAMBLE}{}", conv.evidence);
    conv.push_user(msg);
    Ok(())
}
