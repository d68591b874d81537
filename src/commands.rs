use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::config::{Config, init_config, show_config};
use crate::corpus::Corpus;
use crate::document::{DocumentSource, PlainTextFile};
use crate::embeddings::Embedder;
use crate::embeddings::ollama::OllamaClient;
use crate::llm;
use crate::mcp::{AskTaxQuestionHandler, McpServer, SERVER_INSTRUCTIONS, SERVER_NAME};
use crate::orchestrator::{Orchestrator, QueryError};
use crate::prompts::render_tool_listing;
use crate::session::Session;

/// Build the corpus from the configured document and serve the retrieval tool on stdio
#[inline]
pub async fn serve(config: &Config) -> Result<()> {
    info!("Starting {} tool server", SERVER_NAME);

    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    match client.health_check() {
        Ok(()) => info!(
            "Ollama connected at {} with model {}",
            config.ollama_url()?,
            client.model()
        ),
        Err(e) => warn!("Ollama may not be ready, corpus build may fail: {}", e),
    }
    let embedder: Arc<dyn Embedder> = Arc::new(client);

    let source = PlainTextFile::new(config.document_path());
    let text = source
        .extract_text()
        .context("Failed to read the document")?;

    let corpus = Arc::new(build_corpus(text, config, Arc::clone(&embedder)).await?);
    if corpus.is_empty() {
        warn!("The document has no text, every question will get an empty context");
    }

    let server = McpServer::new(SERVER_NAME.to_string(), env!("CARGO_PKG_VERSION").to_string())
        .context("Failed to create MCP server")?
        .with_instructions(SERVER_INSTRUCTIONS);
    server
        .register_tool(
            AskTaxQuestionHandler::tool_definition(),
            AskTaxQuestionHandler::new(corpus, embedder),
        )
        .await
        .context("Failed to register ask_tax_question tool")?;

    Arc::new(server).serve_stdio().await
}

/// Chunk, embed and index `text` on a blocking thread
#[inline]
pub async fn build_corpus(
    text: String,
    config: &Config,
    embedder: Arc<dyn Embedder>,
) -> Result<Corpus> {
    let chunking = config.chunking.clone();
    let corpus = tokio::task::spawn_blocking(move || {
        Corpus::build(&text, &chunking, embedder.as_ref())
    })
    .await?
    .context("Failed to build the document index")?;

    info!("Indexed {} chunks", corpus.len());
    Ok(corpus)
}

/// Program and arguments that start the tool server.
///
/// Without a configured command the running executable is used, pointed at
/// the same configuration directory.
#[inline]
pub fn server_invocation(config: &Config) -> Result<(PathBuf, Vec<String>)> {
    if let Some(command) = &config.server.command {
        return Ok((command.clone(), config.server.args.clone()));
    }

    let program = std::env::current_exe().context("Failed to locate the running executable")?;
    let mut args = vec![
        "--config-dir".to_string(),
        config.get_base_dir().display().to_string(),
    ];
    args.extend(config.server.args.iter().cloned());
    Ok((program, args))
}

async fn connect(config: &Config) -> Result<Session> {
    let (program, args) = server_invocation(config)?;
    Session::connect_stdio(&program, &args)
        .await
        .with_context(|| format!("Failed to connect to tool server {}", program.display()))
}

async fn close(mut session: Session) {
    if let Err(e) = session.close().await {
        warn!("Failed to close tool session: {}", e);
    }
}

/// Answer a single question and print the answer
#[inline]
pub async fn ask(config: &Config, question: &str) -> Result<()> {
    let orchestrator = Orchestrator::new(llm::from_config(config)?);
    let mut session = connect(config).await?;

    let outcome = orchestrator.process_query(&mut session, question).await;
    close(session).await;

    println!("{}", outcome?);
    Ok(())
}

/// Read questions from stdin until `quit` or end of input
#[inline]
pub async fn chat(config: &Config) -> Result<()> {
    let orchestrator = Orchestrator::new(llm::from_config(config)?);
    let mut session = connect(config).await?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = run_chat(&orchestrator, &mut session, stdin, tokio::io::stdout()).await;
    close(session).await;

    outcome
}

/// Question/answer loop over arbitrary streams.
///
/// Returns when the input ends, a line reads `quit`, or the session fails.
/// A language model failure is reported and the loop goes on.
#[inline]
pub async fn run_chat<R, W>(
    orchestrator: &Orchestrator,
    session: &mut Session,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    eprintln!(
        "{}",
        style("Ask a question about the Tax Procedures Act, or type 'quit' to exit.").dim()
    );

    let mut lines = input.lines();
    loop {
        eprint!("{} ", style("Question:").bold().cyan());
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("quit") {
            break;
        }

        let answer = match orchestrator.process_query(session, question).await {
            Ok(answer) => answer,
            Err(QueryError::Inference(e)) => {
                error!("Language model failed: {}", e);
                format!("Error: the language model failed: {e}")
            }
            Err(e) => return Err(e.into()),
        };
        output.write_all(answer.as_bytes()).await?;
        output.write_all(b"\n\n").await?;
        output.flush().await?;
    }
    Ok(())
}

/// Print the tools offered by the tool server
#[inline]
pub async fn list_tools(config: &Config) -> Result<()> {
    let session = connect(config).await?;
    let listing = session.tools().map(render_tool_listing);
    close(session).await;

    print!("{}", listing?);
    Ok(())
}

/// `config` subcommand
#[inline]
pub fn configure(config: &Config, init: bool) -> Result<()> {
    if init {
        init_config(config)?;
    } else {
        show_config(config);
    }
    Ok(())
}
