use crate::llm::Llm;
use crate::types::{Conversation, Verdict};
use anyhow::{Context, Result};

/// Run one schema-constrained completion over the evidence-augmented
/// conversation and validate the result locally. Malformed output (bad
/// JSON, out-of-range scores, empty explanation) is an error here and a
/// retry upstream; the `time`-on-incorrect violation is repaired instead.
pub async fn extract_verdict(llm: &dyn Llm, conv: &mut Conversation) -> Result<Verdict> {
    let raw = llm.chat_verdict(conv.messages.clone()).await?;
    let verdict: Verdict =
        serde_json::from_str(raw.trim()).context("verdict did not match schema")?;
    let verdict = verdict.normalized()?;
    conv.verdict = Some(verdict.clone());
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Claim;
    use anyhow::Result;
    use async_openai::types::ChatCompletionRequestMessage;

    struct CannedVerdict {
        json: &'static str,
    }
    #[async_trait::async_trait]
    impl Llm for CannedVerdict {
        async fn chat(&self, _m: Vec<ChatCompletionRequestMessage>) -> Result<String> {
            unreachable!("extractor only uses structured output")
        }
        async fn chat_verdict(&self, _m: Vec<ChatCompletionRequestMessage>) -> Result<String> {
            Ok(self.json.to_string())
        }
    }

    fn conv() -> Conversation {
        Conversation::new(&Claim { show_name: "House".into(), guess: "g".into() }, "sys", "u".into())
    }

    #[tokio::test]
    async fn well_formed_verdict_is_returned_and_recorded() {
        let llm = CannedVerdict {
            json: r#"{"is_correct":true,"accuracy":0.9,"time":"series finale","explanation":"Happens in the last episode.","confidence":0.85}"#,
        };
        let mut c = conv();
        let v = extract_verdict(&llm, &mut c).await.unwrap();
        assert!(v.is_correct);
        assert_eq!(v.time.as_deref(), Some("series finale"));
        assert_eq!(c.verdict, Some(v));
    }

    #[tokio::test]
    async fn incorrect_verdict_with_time_is_repaired() {
        let llm = CannedVerdict {
            json: r#"{"is_correct":false,"accuracy":0.2,"time":"season 2","explanation":"Does not happen.","confidence":0.7}"#,
        };
        let v = extract_verdict(&llm, &mut conv()).await.unwrap();
        assert!(!v.is_correct);
        assert_eq!(v.time, None);
    }

    #[tokio::test]
    async fn out_of_range_accuracy_is_rejected() {
        let llm = CannedVerdict {
            json: r#"{"is_correct":true,"accuracy":1.4,"time":null,"explanation":"e","confidence":0.5}"#,
        };
        assert!(extract_verdict(&llm, &mut conv()).await.is_err());
    }

    #[tokio::test]
    async fn non_json_output_is_rejected() {
        let llm = CannedVerdict { json: "I think the guess is correct." };
        assert!(extract_verdict(&llm, &mut conv()).await.is_err());
    }
}
