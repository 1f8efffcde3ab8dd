// Prompt constants for the resume chat assistant.

/// Chat system message template, rebuilt on every turn.
/// Replace: {resume_text}, {job_description}, {analysis_feedback}
pub const CHAT_SYSTEM_TEMPLATE: &str = r#"You are a helpful assistant for resume optimization.
The user has uploaded the following resume:
{resume_text}

The user also provided the following job description:
{job_description}

This was the resume analysis that you previously gave the user:
{analysis_feedback}

Provide answers based on this information."#;
