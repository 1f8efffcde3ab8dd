//! Conversation Context Builder.
//!
//! The system message is a request-time construct: it is rebuilt from the
//! current session on every turn and never stored in the transcript.

use crate::chat::prompts::CHAT_SYSTEM_TEMPLATE;
use crate::llm_client::ChatMessage;
use crate::session::Session;
use crate::template;

/// Returns `[system] + transcript` for the next chat request.
pub fn build_context(session: &Session) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(session.messages().len() + 1);
    messages.push(ChatMessage::system(build_system_message(session)));
    messages.extend(session.messages().iter().map(ChatMessage::from));
    messages
}

/// Interpolates the current analysis context. Absent values become empty strings.
pub fn build_system_message(session: &Session) -> String {
    template::fill(
        CHAT_SYSTEM_TEMPLATE,
        &[
            ("resume_text", session.resume_text().unwrap_or_default()),
            ("job_description", session.job_description().unwrap_or_default()),
            ("analysis_feedback", session.analysis_feedback().unwrap_or_default()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ChatRole;
    use crate::session::AnalysisCycle;

    fn analyzed_session(feedback: &str) -> Session {
        let mut session = Session::new();
        session.complete_analysis(AnalysisCycle {
            resume_text: "Experienced engineer...".to_string(),
            job_description: "Looking for a Python developer".to_string(),
            feedback: feedback.to_string(),
        });
        session
    }

    #[test]
    fn test_context_is_system_then_transcript() {
        let mut session = analyzed_session("Score: 58/100");
        session.push_user("What should I improve?");
        session.push_assistant("Lead with Python.");
        session.push_user("And the summary?");

        let context = build_context(&session);

        assert_eq!(context.len(), 4);
        assert_eq!(context[0].role, ChatRole::System);
        assert_eq!(context[1].role, ChatRole::User);
        assert_eq!(context[1].content, "What should I improve?");
        assert_eq!(context[2].role, ChatRole::Assistant);
        assert_eq!(context[3].content, "And the summary?");
    }

    #[test]
    fn test_system_message_interpolates_analysis() {
        let session = analyzed_session("Score: 58/100");
        let system = build_system_message(&session);
        assert!(system.contains("Experienced engineer..."));
        assert!(system.contains("Looking for a Python developer"));
        assert!(system.contains("Score: 58/100"));
        assert!(!system.contains('{'));
    }

    #[test]
    fn test_system_message_is_not_stored() {
        let mut session = analyzed_session("Score: 58/100");
        session.push_user("Hi");
        build_context(&session);
        build_context(&session);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_system_message_reflects_latest_analysis() {
        let mut session = analyzed_session("Score: 40/100");
        session.push_user("Hi");
        session.complete_analysis(AnalysisCycle {
            resume_text: "Revised resume".to_string(),
            job_description: "Looking for a Python developer".to_string(),
            feedback: "Score: 88/100".to_string(),
        });
        let context = build_context(&session);
        assert!(context[0].content.contains("Score: 88/100"));
        assert!(!context[0].content.contains("Score: 40/100"));
    }

    #[test]
    fn test_placeholder_text_in_resume_is_kept_verbatim() {
        let mut session = Session::new();
        session.complete_analysis(AnalysisCycle {
            resume_text: "Skills: Jinja templates like {job_description} and {analysis_feedback}"
                .to_string(),
            job_description: "JD-TEXT".to_string(),
            feedback: "FEEDBACK".to_string(),
        });

        let system = build_system_message(&session);

        assert!(system.contains(
            "Skills: Jinja templates like {job_description} and {analysis_feedback}\n"
        ));
        assert_eq!(system.matches("JD-TEXT").count(), 1);
        assert_eq!(system.matches("FEEDBACK").count(), 1);
    }

    #[test]
    fn test_empty_session_builds_empty_context() {
        let mut session = Session::new();
        session.push_user("What should I improve?");
        let context = build_context(&session);
        assert_eq!(context.len(), 2);
        assert!(context[0]
            .content
            .contains("The user has uploaded the following resume:\n\n"));
        assert!(!context[0].content.contains("None"));
    }
}
