use anyhow::{bail, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs,
};
use serde::{Deserialize, Serialize};

/// Fixed explanation carried by the fallback verdict. Callers can only
/// distinguish "evaluation failed" from "evaluated as incorrect" by this
/// exact text.
pub const FALLBACK_EXPLANATION: &str =
    "Could not evaluate the guess due to an error. Please try again later.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub show_name: String,
    pub guess: String,
}

/// Structured evaluation of a plot guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_correct: bool,
    /// 0-1 scale; grading is lenient, partial matches score above zero.
    pub accuracy: f32,
    /// Narrative point where the guessed event occurs; null when incorrect.
    #[serde(default)]
    pub time: Option<String>,
    pub explanation: String,
    /// 0-1 scale.
    pub confidence: f32,
}

impl Verdict {
    /// Enforce the verdict invariants locally rather than trusting the
    /// engine's structured-output mode. The `time` field is repairable
    /// (dropped when the verdict is incorrect or the value is blank);
    /// out-of-range scores and an empty explanation are rejected so the
    /// caller retries instead of serving a fabricated grade.
    pub fn normalized(mut self) -> Result<Verdict> {
        if !(0.0..=1.0).contains(&self.accuracy) {
            bail!("accuracy {} outside [0,1]", self.accuracy);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            bail!("confidence {} outside [0,1]", self.confidence);
        }
        if self.explanation.trim().is_empty() {
            bail!("empty explanation");
        }
        if !self.is_correct {
            self.time = None;
        } else if self.time.as_deref().is_some_and(|t| t.trim().is_empty()) {
            self.time = None;
        }
        Ok(self)
    }

    /// The deterministic verdict substituted when all evaluation attempts
    /// fail.
    pub fn fallback() -> Verdict {
        Verdict {
            is_correct: false,
            accuracy: 0.0,
            time: None,
            explanation: FALLBACK_EXPLANATION.to_string(),
            confidence: 0.0,
        }
    }
}

/// Working memory for one in-flight evaluation. Built fresh per attempt,
/// never shared between requests.
pub struct Conversation {
    pub messages: Vec<ChatCompletionRequestMessage>,
    pub show_name: String,
    pub guess: String,
    pub evidence: String,
    pub verdict: Option<Verdict>,
}

impl Conversation {
    pub fn new(claim: &Claim, system_prompt: &str, user_prompt: String) -> Conversation {
        let sys = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .unwrap()
            .into();
        let usr = ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()
            .unwrap()
            .into();
        Conversation {
            messages: vec![sys, usr],
            show_name: claim.show_name.clone(),
            guess: claim.guess.clone(),
            evidence: String::new(),
            verdict: None,
        }
    }

    pub fn push_user(&mut self, content: String) {
        let msg = ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .unwrap()
            .into();
        self.messages.push(msg);
    }
}
