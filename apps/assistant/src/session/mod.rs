//! Session State Store: process-local state for one conversation.
//!
//! The four analysis fields only change together through
//! `complete_analysis`, and the transcript is append-only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm_client::{ChatMessage, ChatRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One visible transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            TurnRole::User => ChatRole::User,
            TurnRole::Assistant => ChatRole::Assistant,
        };
        ChatMessage {
            role,
            content: turn.content.clone(),
        }
    }
}

/// The result of a successful analysis cycle, installed as one unit.
#[derive(Debug, Clone)]
pub struct AnalysisCycle {
    pub resume_text: String,
    pub job_description: String,
    pub feedback: String,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    resume_text: Option<String>,
    job_description: Option<String>,
    analysis_feedback: Option<String>,
    messages: Vec<Turn>,
    // Reserved lifecycle flag. Nothing reads it.
    #[allow(dead_code)]
    chat_initialized: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            resume_text: None,
            job_description: None,
            analysis_feedback: None,
            messages: Vec::new(),
            chat_initialized: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn resume_text(&self) -> Option<&str> {
        self.resume_text.as_deref()
    }

    pub fn job_description(&self) -> Option<&str> {
        self.job_description.as_deref()
    }

    pub fn analysis_feedback(&self) -> Option<&str> {
        self.analysis_feedback.as_deref()
    }

    /// True iff feedback is present. Derived, so it can never disagree.
    pub fn analysis_complete(&self) -> bool {
        self.analysis_feedback.is_some()
    }

    #[cfg(test)]
    pub fn chat_initialized(&self) -> bool {
        self.chat_initialized
    }

    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    /// Replaces resume text, job description and feedback as one group.
    pub fn complete_analysis(&mut self, cycle: AnalysisCycle) {
        self.resume_text = Some(cycle.resume_text);
        self.job_description = Some(cycle.job_description);
        self.analysis_feedback = Some(cycle.feedback);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Turn {
            role: TurnRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Turn {
            role: TurnRole::Assistant,
            content: content.into(),
        });
    }
}
