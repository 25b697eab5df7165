//! LLM integration module.
//!
//! Provides an OpenAI-compatible client for chat completions, the
//! [`JudgmentProvider`] seam the audit evaluator calls through, and the
//! prompts used for compliance judgments.

pub(crate) mod client;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::Prompts;

use crate::error::Result;
use std::future::Future;

/// An external language-model service that answers a judgment prompt.
///
/// Implementations own their timeout; callers do not retry.
pub trait JudgmentProvider: Send + Sync {
    /// Send one prompt and return the raw text answer.
    fn judge(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;

    /// Short human-readable name for logs and reports.
    fn name(&self) -> &str;
}
