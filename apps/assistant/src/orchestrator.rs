//! Session Orchestrator: wires user actions to the session state machine.
//!
//! Flow: select_file + set_job_description → analyze (extract → feedback)
//!       → AnalysisShown; send_message → context → streamed reply → transcript.
//!
//! One action runs at a time and there is at most one chat request in
//! flight: a `ChatExchange` holds the session mutably until it is dropped.

use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::FeedbackRequestBuilder;
use crate::chat::assembler::{AssemblyEvent, ResponseAssembly, StreamingAssembler};
use crate::chat::context::build_context;
use crate::errors::AppError;
use crate::extract::{DocumentExtractor, DocumentFormat};
use crate::session::{AnalysisCycle, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingUpload,
    Analyzing,
    AnalysisShown,
}

/// A file picked by the user but not yet analyzed.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Pending form input. Only consumed by `analyze`.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    job_description: String,
}

pub struct SessionOrchestrator {
    session: Session,
    phase: Phase,
    form: UploadForm,
    extractor: Arc<dyn DocumentExtractor>,
    analyzer: FeedbackRequestBuilder,
    assembler: StreamingAssembler,
}

impl SessionOrchestrator {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        analyzer: FeedbackRequestBuilder,
        assembler: StreamingAssembler,
    ) -> Self {
        let session = Session::new();
        info!("Session {} started", session.id());
        Self {
            session,
            phase: Phase::AwaitingUpload,
            form: UploadForm::default(),
            extractor,
            analyzer,
            assembler,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn feedback(&self) -> Option<&str> {
        self.session.analysis_feedback()
    }

    /// Whether the upload form is still offered.
    pub fn form_visible(&self) -> bool {
        !self.session.analysis_complete()
    }

    pub fn select_file(&mut self, filename: impl Into<String>, content: Vec<u8>) {
        let file = UploadedFile {
            filename: filename.into(),
            content,
        };
        info!(
            "Session {}: selected {} ({} bytes)",
            self.session.id(),
            file.filename,
            file.content.len()
        );
        self.form.file = Some(file);
    }

    #[cfg(test)]
    pub fn selected_file(&self) -> Option<&UploadedFile> {
        self.form.file.as_ref()
    }

    pub fn set_job_description(&mut self, text: impl Into<String>) {
        self.form.job_description = text.into();
    }

    #[cfg(test)]
    pub fn job_description_draft(&self) -> &str {
        &self.form.job_description
    }

    /// Runs extraction and the feedback request for the current form.
    ///
    /// On any failure the phase returns to `AwaitingUpload` and the session
    /// is left exactly as it was.
    pub async fn analyze(&mut self) -> Result<&str, AppError> {
        if self.phase == Phase::AnalysisShown {
            return Err(AppError::Validation("Analysis already complete.".to_string()));
        }

        self.phase = Phase::Analyzing;
        match self.run_analysis().await {
            Ok(cycle) => {
                self.session.complete_analysis(cycle);
                self.phase = Phase::AnalysisShown;
                info!("Session {}: analysis complete", self.session.id());
                Ok(self.session.analysis_feedback().unwrap_or_default())
            }
            Err(e) => {
                self.phase = Phase::AwaitingUpload;
                warn!("Session {}: analysis aborted: {}", self.session.id(), e);
                Err(e)
            }
        }
    }

    async fn run_analysis(&mut self) -> Result<AnalysisCycle, AppError> {
        let file = self
            .form
            .file
            .as_ref()
            .ok_or_else(|| AppError::Validation("Please upload a resume file.".to_string()))?;

        if self.form.job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "Please upload both a resume and job description.".to_string(),
            ));
        }

        let format = DocumentFormat::from_filename(&file.filename).ok_or_else(|| {
            AppError::Validation(
                "Unsupported file format. Please upload a .pdf or .docx file.".to_string(),
            )
        })?;

        let resume_text = self.extractor.extract(&file.content, format);
        if resume_text.trim().is_empty() {
            return Err(AppError::Validation(
                "Could not extract any text from the resume.".to_string(),
            ));
        }

        let job_description = self.form.job_description.clone();
        let feedback = self
            .analyzer
            .analyze(&resume_text, &job_description)
            .await
            .ok_or_else(|| AppError::Llm("Analysis failed. Please try again.".to_string()))?;

        Ok(AnalysisCycle {
            resume_text,
            job_description,
            feedback,
        })
    }

    /// Appends the user turn and starts the assistant reply.
    ///
    /// Chat is available in every phase; before analysis the system message
    /// simply carries empty context.
    pub fn send_message(&mut self, text: &str) -> Result<ChatExchange<'_>, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Message cannot be empty.".to_string()));
        }

        self.session.push_user(text);
        let context = build_context(&self.session);
        info!(
            "Session {}: chat turn {} ({} context messages)",
            self.session.id(),
            self.session.messages().len(),
            context.len()
        );

        Ok(ChatExchange {
            assembly: self.assembler.respond(context),
            session: &mut self.session,
        })
    }
}

/// One chat turn in progress. Pull events with `next_event`; the assistant
/// turn is appended when `Finished` is produced. Dropping the exchange
/// before that leaves the transcript without an assistant turn.
pub struct ChatExchange<'a> {
    session: &'a mut Session,
    assembly: ResponseAssembly,
}

impl ChatExchange<'_> {
    pub async fn next_event(&mut self) -> Option<AssemblyEvent> {
        let event = self.assembly.next_event().await?;
        if let AssemblyEvent::Finished(outcome) = &event {
            self.session.push_assistant(outcome.text.clone());
        }
        Some(event)
    }

    /// Drains the exchange and returns its outcome.
    #[cfg(test)]
    pub async fn finish(mut self) -> crate::chat::assembler::AssemblyOutcome {
        while self.next_event().await.is_some() {}
        self.assembly.finish().await
    }
}
