//! Terminal front end: the upload form, the feedback display and the chat
//! transcript, driven line by line.
//!
//! Generic over its input and output so tests can script a whole session.

use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::debug;

use crate::chat::assembler::{AssemblyEvent, AssemblyStatus};
use crate::errors::AppError;
use crate::orchestrator::SessionOrchestrator;
use crate::session::TurnRole;

const TITLE: &str = "Resume Analyzer";
/// Trails partial text while a reply is still streaming.
const IN_PROGRESS: &str = "\u{258c}";
const ERASE_IN_PROGRESS: &str = "\u{8} \u{8}";
const END_OF_INPUT: &str = "/end";

const HELP: &str = "\
Commands:
  /upload <path>   choose a resume file (.pdf or .docx)
  /jd <text>       set the job description (/jd alone for multi-line input, finish with /end)
  /analyze         analyze the resume against the job description
  /feedback        show the resume analysis again
  /history         show the chat transcript
  /help            show this help
  /quit            exit
Anything else is sent to the resume assistant.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Empty,
    Help,
    Quit,
    Upload(String),
    JobDescription(Option<String>),
    Analyze,
    Feedback,
    History,
    Unknown(String),
    Chat(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if !line.starts_with('/') {
            return Command::Chat(line.to_string());
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name {
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            "/upload" => Command::Upload(rest.to_string()),
            "/jd" if rest.is_empty() => Command::JobDescription(None),
            "/jd" => Command::JobDescription(Some(rest.to_string())),
            "/analyze" => Command::Analyze,
            "/feedback" => Command::Feedback,
            "/history" => Command::History,
            other => Command::Unknown(other.to_string()),
        }
    }
}

pub struct Console<R, W> {
    lines: Lines<R>,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            lines: input.lines(),
            out: output,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until `/quit` or end of input. Action errors are shown and the
    /// loop continues; only I/O failures on the terminal end it.
    pub async fn run(&mut self, orchestrator: &mut SessionOrchestrator) -> Result<(), AppError> {
        self.say(&format!("{TITLE}\n")).await?;
        self.say(HELP).await?;

        while let Some(line) = self.read_line().await? {
            let command = Command::parse(&line);
            debug!("Console command: {:?}", command);

            match command {
                Command::Empty => {}
                Command::Help => self.say(HELP).await?,
                Command::Quit => break,
                Command::Upload(path) => self.upload(orchestrator, &path).await?,
                Command::JobDescription(text) => self.job_description(orchestrator, text).await?,
                Command::Analyze => self.analyze(orchestrator).await?,
                Command::Feedback => self.show_feedback(orchestrator).await?,
                Command::History => self.show_history(orchestrator).await?,
                Command::Unknown(name) => {
                    self.say(&format!("Unknown command {name}. Type /help for commands."))
                        .await?
                }
                Command::Chat(text) => self.chat(orchestrator, &text).await?,
            }
        }

        Ok(())
    }

    async fn upload(
        &mut self,
        orchestrator: &mut SessionOrchestrator,
        path: &str,
    ) -> Result<(), AppError> {
        if !orchestrator.form_visible() {
            return self.say_analysis_complete().await;
        }
        if path.is_empty() {
            return self.say("Usage: /upload <path>").await;
        }

        match tokio::fs::read(path).await {
            Ok(content) => {
                let filename = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string());
                self.say(&format!("Selected {filename} ({} bytes).", content.len()))
                    .await?;
                orchestrator.select_file(filename, content);
                Ok(())
            }
            Err(e) => self.say(&format!("Error reading file: {e}")).await,
        }
    }

    async fn job_description(
        &mut self,
        orchestrator: &mut SessionOrchestrator,
        text: Option<String>,
    ) -> Result<(), AppError> {
        if !orchestrator.form_visible() {
            return self.say_analysis_complete().await;
        }

        let text = match text {
            Some(text) => text,
            None => {
                self.say(&format!(
                    "Paste the job description here, then {END_OF_INPUT} on its own line:"
                ))
                .await?;
                let mut collected = Vec::new();
                while let Some(line) = self.read_line().await? {
                    if line.trim() == END_OF_INPUT {
                        break;
                    }
                    collected.push(line);
                }
                collected.join("\n")
            }
        };

        let chars = text.trim().chars().count();
        orchestrator.set_job_description(text);
        self.say(&format!("Job description set ({chars} characters).")).await
    }

    async fn analyze(&mut self, orchestrator: &mut SessionOrchestrator) -> Result<(), AppError> {
        if !orchestrator.form_visible() {
            return self.say_analysis_complete().await;
        }

        self.say("Analyzing your resume...").await?;
        match orchestrator.analyze().await {
            Ok(feedback) => {
                let rendered = render_feedback(feedback);
                self.say(&rendered).await
            }
            Err(e) => self.say(&e.user_message()).await,
        }
    }

    async fn show_feedback(&mut self, orchestrator: &SessionOrchestrator) -> Result<(), AppError> {
        match orchestrator.feedback() {
            Some(feedback) => {
                let rendered = render_feedback(feedback);
                self.say(&rendered).await
            }
            None => {
                self.say("No analysis yet. Use /upload, /jd and /analyze first.")
                    .await
            }
        }
    }

    async fn show_history(&mut self, orchestrator: &SessionOrchestrator) -> Result<(), AppError> {
        let messages = orchestrator.session().messages();
        if messages.is_empty() {
            return self.say("No messages yet.").await;
        }
        let transcript = messages
            .iter()
            .map(|turn| {
                let speaker = match turn.role {
                    TurnRole::User => "You",
                    TurnRole::Assistant => "Assistant",
                };
                format!("{speaker}: {}", turn.content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.say(&transcript).await
    }

    async fn chat(
        &mut self,
        orchestrator: &mut SessionOrchestrator,
        text: &str,
    ) -> Result<(), AppError> {
        let mut exchange = match orchestrator.send_message(text) {
            Ok(exchange) => exchange,
            Err(e) => return self.say(&e.user_message()).await,
        };

        self.say("Assistant is responding...").await?;
        let mut shown = 0usize;
        let mut indicator = false;

        while let Some(event) = exchange.next_event().await {
            match event {
                AssemblyEvent::Partial(text) => {
                    if indicator {
                        self.write(ERASE_IN_PROGRESS).await?;
                    }
                    let fresh = text.get(shown..).unwrap_or(&text);
                    self.write(fresh).await?;
                    self.write(IN_PROGRESS).await?;
                    shown = text.len();
                    indicator = true;
                }
                AssemblyEvent::Retrying {
                    attempt,
                    max_attempts,
                } => {
                    self.end_stream_line(&mut indicator, shown).await?;
                    shown = 0;
                    self.say(&format!(
                        "Connection error, retrying... ({attempt}/{max_attempts})"
                    ))
                    .await?;
                }
                AssemblyEvent::Finished(outcome) => {
                    self.end_stream_line(&mut indicator, shown).await?;
                    match outcome.status {
                        AssemblyStatus::Completed => {}
                        AssemblyStatus::Exhausted { attempts, error } => {
                            self.say(&format!(
                                "Connection failed after {attempts} attempts: {error}"
                            ))
                            .await?
                        }
                        AssemblyStatus::Fatal { error } => {
                            self.say(&format!("Assistant request failed: {error}"))
                                .await?
                        }
                        AssemblyStatus::MissingStream => {
                            self.say("Failed to get assistant response.").await?
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Removes the in-progress indicator and closes the line of streamed text.
    async fn end_stream_line(&mut self, indicator: &mut bool, shown: usize) -> Result<(), AppError> {
        if *indicator {
            self.write(ERASE_IN_PROGRESS).await?;
            *indicator = false;
        }
        if shown > 0 {
            self.write("\n").await?;
        }
        Ok(())
    }

    async fn say_analysis_complete(&mut self) -> Result<(), AppError> {
        self.say("Analysis already complete. Ask the assistant anything, or /feedback to see it again.")
            .await
    }

    async fn read_line(&mut self) -> Result<Option<String>, AppError> {
        self.write("> ").await?;
        let line = self
            .lines
            .next_line()
            .await
            .context("Failed to read from terminal")?;
        Ok(line)
    }

    async fn say(&mut self, text: &str) -> Result<(), AppError> {
        self.write(text).await?;
        self.write("\n").await
    }

    async fn write(&mut self, text: &str) -> Result<(), AppError> {
        self.out
            .write_all(text.as_bytes())
            .await
            .context("Failed to write to terminal")?;
        self.out
            .flush()
            .await
            .context("Failed to flush terminal")?;
        Ok(())
    }
}

fn render_feedback(feedback: &str) -> String {
    format!("\n== Resume Analysis ==\n{feedback}\n")
}
