//! Feedback Request Builder: one-shot ATS analysis of a resume against a job description.
//!
//! Results are memoized by the exact `(resume_text, job_description)` pair
//! for the lifetime of the owning session. Failures are never cached.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::llm_client::{ChatMessage, CompletionBackend, CompletionRequest, LlmError};
use crate::template;

pub mod prompts;

use prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM};

pub struct FeedbackRequestBuilder {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    max_tokens: u32,
    // Unbounded: one entry per distinct pair analyzed in this session.
    cache: HashMap<(String, String), String>,
}

impl FeedbackRequestBuilder {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: String, max_tokens: u32) -> Self {
        Self {
            backend,
            model,
            max_tokens,
            cache: HashMap::new(),
        }
    }

    /// Returns feedback for the pair, or `None` if the remote call failed.
    ///
    /// Callers must pass non-empty values. A cached pair returns the stored
    /// feedback without a remote call.
    pub async fn analyze(&mut self, resume_text: &str, job_description: &str) -> Option<String> {
        if let Some(feedback) = self.cached(resume_text, job_description) {
            info!("Resume analysis served from cache");
            return Some(feedback.to_string());
        }

        match self.request_feedback(resume_text, job_description).await {
            Ok(feedback) => {
                self.cache.insert(
                    (resume_text.to_string(), job_description.to_string()),
                    feedback.clone(),
                );
                Some(feedback)
            }
            Err(e) => {
                error!("Resume analysis failed: {e}");
                None
            }
        }
    }

    pub fn cached(&self, resume_text: &str, job_description: &str) -> Option<&str> {
        self.cache
            .get(&(resume_text.to_string(), job_description.to_string()))
            .map(String::as_str)
    }

    #[cfg(test)]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    async fn request_feedback(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(ANALYSIS_SYSTEM),
                ChatMessage::user(build_analysis_prompt(resume_text, job_description)),
            ],
            max_tokens: self.max_tokens,
        };

        info!(
            "Requesting resume analysis (model: {}, resume: {} chars, jd: {} chars)",
            self.model,
            resume_text.len(),
            job_description.len()
        );

        let feedback = self.backend.complete(&request).await?;
        if feedback.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(feedback)
    }
}

pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    template::fill(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("resume_text", resume_text),
            ("job_description", job_description),
        ],
    )
}
