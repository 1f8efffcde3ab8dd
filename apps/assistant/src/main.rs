mod analysis;
mod chat;
mod config;
mod console;
mod errors;
mod extract;
mod llm_client;
mod orchestrator;
mod session;
mod template;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::FeedbackRequestBuilder;
use crate::chat::assembler::{RetryPolicy, StreamingAssembler};
use crate::config::Config;
use crate::console::Console;
use crate::extract::TextExtractor;
use crate::llm_client::{CompletionBackend, LlmClient};
use crate::orchestrator::SessionOrchestrator;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Logs go to stderr; stdout belongs to the console
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting resume assistant v{}", env!("CARGO_PKG_VERSION"));

    let backend: Arc<dyn CompletionBackend> = Arc::new(LlmClient::new(
        config.openai_api_key.clone(),
        &config.openai_base_url,
        config.request_timeout,
    )?);
    info!(
        "LLM client initialized (analysis: {}, chat: {})",
        config.analysis_model, config.chat_model
    );

    let analyzer = FeedbackRequestBuilder::new(
        backend.clone(),
        config.analysis_model.clone(),
        config.analysis_max_tokens,
    );
    let assembler = StreamingAssembler::new(
        backend,
        config.chat_model.clone(),
        config.chat_max_tokens,
        RetryPolicy {
            max_attempts: config.chat_max_attempts,
            backoff: config.chat_retry_backoff,
        },
    );
    let mut orchestrator =
        SessionOrchestrator::new(Arc::new(TextExtractor), analyzer, assembler);

    let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    console.run(&mut orchestrator).await?;

    info!("Session {} ended", orchestrator.session().id());
    Ok(())
}
