
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::chat::{ChatModel, Transcript, Tutor, answer_question};
use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::Embedder;
use crate::extractor::Document;
use crate::mail::{EmailDraft, GmailClient, MailAgent, MailPlan};
use crate::notion::NotionClient;
use crate::pipeline::{IndexSummary, PipelineOptions, RagPipeline, SessionContext, SessionState};
use crate::provider::OpenAiClient;

/// A line typed into an interactive session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `/process <pdf>...`
    Process(Vec<PathBuf>),
    Reset,
    History,
    Help,
    Quit,
    /// Any line that is not a command
    Question(String),
    /// A `/word` that is not a known command
    Unknown(String),
    Empty,
}

impl ChatCommand {
    #[inline]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Self::Question(line.to_string());
        };

        let (name, args) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        match name {
            "process" => Self::Process(split_paths(args).into_iter().map(PathBuf::from).collect()),
            "reset" => Self::Reset,
            "history" => Self::History,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Split command arguments on whitespace. Single or double quotes keep a
/// path with spaces together; an unterminated quote runs to the end.
fn split_paths(args: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for c in args.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    paths.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        paths.push(current);
    }
    paths
}

/// What the chat loop should show after a command ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Answer(String),
    Processed(IndexSummary),
    History(Transcript),
    Reset,
    Help,
    Quit,
    Nothing,
}

const HELP: &str = "Commands:
  /process <pdf>...  index one or more PDF files, replacing the current index
                     (quote paths that contain spaces)
  /reset             clear the conversation (the index is kept)
  /history           show the conversation so far
  /quit              leave the chat
Anything else is sent as a question.";

fn load_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).context("Failed to load configuration")
}

fn provider_client(config: &Config) -> Result<OpenAiClient> {
    OpenAiClient::new(&config.provider).context("Failed to create provider client")
}

async fn open_pipeline(
    config: &Config,
    options: PipelineOptions,
) -> Result<RagPipeline<OpenAiClient, OpenAiClient>> {
    let client = provider_client(config)?;
    let store = VectorStore::open(config)
        .await
        .context("Failed to open vector store")?;
    Ok(RagPipeline::new(store, client.clone(), client, options)?)
}

/// Load PDFs from disk; the first unreadable file aborts the upload
#[inline]
pub fn load_pdfs(paths: &[PathBuf]) -> crate::Result<Vec<Document>> {
    paths.iter().map(|p| Document::from_pdf_path(p)).collect()
}

/// Run one parsed command against a session
#[inline]
pub async fn run_chat_command<E: Embedder, M: ChatModel>(
    pipeline: &RagPipeline<E, M>,
    session: &mut SessionContext,
    command: ChatCommand,
) -> crate::Result<ChatReply> {
    match command {
        ChatCommand::Process(paths) => {
            let documents = load_pdfs(&paths)?;
            let summary = pipeline.process_documents(session, &documents).await?;
            Ok(ChatReply::Processed(summary))
        }
        ChatCommand::Question(question) => {
            let answer = pipeline.ask(session, &question).await?;
            Ok(ChatReply::Answer(answer))
        }
        ChatCommand::Reset => {
            session.reset();
            Ok(ChatReply::Reset)
        }
        ChatCommand::History => Ok(ChatReply::History(session.transcript().clone())),
        ChatCommand::Help | ChatCommand::Unknown(_) => Ok(ChatReply::Help),
        ChatCommand::Quit => Ok(ChatReply::Quit),
        ChatCommand::Empty => Ok(ChatReply::Nothing),
    }
}

fn print_summary(summary: &IndexSummary) {
    println!(
        "{} Indexed {} passages from {} documents into '{}'",
        style("✓").green(),
        summary.passages,
        summary.documents,
        summary.index_name
    );
}

fn print_transcript(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("{}", style("No conversation yet.").dim());
        return;
    }
    for turn in transcript.turns() {
        println!("{}: {}", style(turn.role).bold(), turn.text);
    }
}

fn read_line(prompt: &str) -> Option<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .ok()
}

/// Index PDFs without starting a chat
#[inline]
pub async fn process_pdfs(config_dir: &Path, paths: &[PathBuf]) -> Result<()> {
    let config = load_config(config_dir)?;
    let pipeline = open_pipeline(&config, PipelineOptions::pdf(&config)).await?;
    let mut session = SessionContext::new();

    let documents = load_pdfs(paths)?;
    let summary = pipeline.process_documents(&mut session, &documents).await?;
    print_summary(&summary);
    Ok(())
}

/// Interactive chat over the PDF index
#[inline]
pub async fn chat(config_dir: &Path, paths: &[PathBuf]) -> Result<()> {
    let config = load_config(config_dir)?;
    let pipeline = open_pipeline(&config, PipelineOptions::pdf(&config)).await?;
    let mut session = pipeline.open_session().await?;

    println!("{}", style("📄 Chat with PDF").bold().cyan());
    if !paths.is_empty() {
        match run_chat_command(&pipeline, &mut session, ChatCommand::Process(paths.to_vec()))
            .await
        {
            Ok(ChatReply::Processed(summary)) => print_summary(&summary),
            Ok(_) => {}
            Err(e) => println!("{} {}", style("Error:").red().bold(), e),
        }
    }
    if session.state() == SessionState::Idle {
        println!("No documents indexed yet. Use /process <pdf>... to add some.");
    }
    println!("{}", style("Type /help for commands.").dim());

    while let Some(line) = read_line("You") {
        let command = ChatCommand::parse(&line);
        if let ChatCommand::Unknown(name) = &command {
            println!("{} unknown command /{}", style("?").yellow(), name);
        }

        match run_chat_command(&pipeline, &mut session, command).await {
            Ok(ChatReply::Answer(answer)) => println!("{} {}", style("Assistant:").green().bold(), answer),
            Ok(ChatReply::Processed(summary)) => print_summary(&summary),
            Ok(ChatReply::History(transcript)) => print_transcript(&transcript),
            Ok(ChatReply::Reset) => println!("{}", style("Conversation cleared.").dim()),
            Ok(ChatReply::Help) => println!("{}", HELP),
            Ok(ChatReply::Quit) => break,
            Ok(ChatReply::Nothing) => {}
            Err(e) => {
                error!("Chat command failed: {}", e);
                println!("{} {}", style("Error:").red().bold(), e);
            }
        }
    }

    info!(
        "Chat ended after {} turns",
        session.transcript().len()
    );
    Ok(())
}

/// Answer one question from the PDF index
#[inline]
pub async fn ask(config_dir: &Path, question: &str) -> Result<()> {
    let config = load_config(config_dir)?;
    let pipeline = open_pipeline(&config, PipelineOptions::pdf(&config)).await?;
    let answer = pipeline.answer_once(question).await?;
    println!("{}", answer);
    Ok(())
}

/// Plain Q&A with no documents
#[inline]
pub fn qa(config_dir: &Path, question: &str) -> Result<()> {
    let config = load_config(config_dir)?;
    let client = provider_client(&config)?.with_temperature(None);
    let answer = answer_question(&client, question)?;
    println!("{}", answer);
    Ok(())
}

/// Conversational tutor with a fixed persona
#[inline]
pub fn tutor(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;
    let client = provider_client(&config)?.with_temperature(config.tutor.temperature);
    let mut tutor = Tutor::new(client, config.tutor.system_prompt.clone());

    println!("{}", style("🎓 Tutor").bold().cyan());
    println!("{}", style("Type /reset to start over, /quit to leave.").dim());

    while let Some(line) = read_line("You") {
        match ChatCommand::parse(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Reset => {
                tutor.reset();
                println!("{}", style("Conversation cleared.").dim());
            }
            ChatCommand::History => print_transcript(tutor.transcript()),
            ChatCommand::Question(message) => match tutor.send(&message) {
                Ok(reply) => println!("{} {}", style("Tutor:").green().bold(), reply),
                Err(e) => println!("{} {}", style("Error:").red().bold(), e),
            },
            ChatCommand::Empty => {}
            ChatCommand::Process(_) | ChatCommand::Help | ChatCommand::Unknown(_) => {
                println!("Commands: /reset, /history, /quit");
            }
        }
    }

    Ok(())
}

/// Pull the Notion database and rebuild the notes index
#[inline]
pub async fn notes_sync(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;
    let database_id = config.notes.resolve_database_id()?;
    let notion = NotionClient::new(&config.notes).context("Failed to create Notion client")?;

    let documents = notion
        .load_documents(&database_id)
        .context("Failed to load pages from Notion")?;
    info!("Loaded {} pages from Notion", documents.len());

    let pipeline = open_pipeline(&config, PipelineOptions::notes(&config)).await?;
    let mut session = SessionContext::new();
    let summary = pipeline.process_documents(&mut session, &documents).await?;
    print_summary(&summary);
    Ok(())
}

/// Answer one question from the notes index
#[inline]
pub async fn notes_ask(config_dir: &Path, question: &str) -> Result<()> {
    let config = load_config(config_dir)?;
    let pipeline = open_pipeline(&config, PipelineOptions::notes(&config)).await?;
    let answer = pipeline.answer_once(question).await?;
    println!("{}", answer);
    Ok(())
}

fn print_draft(draft: &EmailDraft) {
    println!("{} {}", style("To:").bold(), draft.to);
    println!("{} {}", style("Subject:").bold(), draft.subject);
    println!();
    println!("{}", draft.body);
    println!();
}

/// Let the model draft email from an instruction and send it through Gmail
#[inline]
pub fn mail_send(config_dir: &Path, instruction: &str, assume_yes: bool) -> Result<()> {
    let config = load_config(config_dir)?;
    let gmail = GmailClient::new(&config.mail).context("Failed to create Gmail client")?;
    let agent = MailAgent::new(provider_client(&config)?, config.mail.system_prompt.clone());

    let drafts = match agent.plan(instruction)? {
        MailPlan::Reply(text) => {
            println!("{} {}", style("Assistant:").green().bold(), text);
            return Ok(());
        }
        MailPlan::Send(drafts) => drafts,
    };

    for draft in &drafts {
        print_draft(draft);
    }

    if !assume_yes
        && !Confirm::new()
            .with_prompt(format!("Send {} email(s)?", drafts.len()))
            .default(false)
            .interact()?
    {
        println!("Nothing sent.");
        return Ok(());
    }

    for sent in gmail.send_all(&drafts)? {
        println!("{} Sent (message id {})", style("✓").green(), sent.id);
    }
    Ok(())
}

/// Report configuration and the state of every index
#[inline]
pub async fn show_status(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir)?;

    println!("📊 PDF Chat Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Provider:");
    println!("   Endpoint: {}", config.provider.base_url);
    println!("   Chat model: {}", config.provider.chat_model);
    println!("   Embedding model: {}", config.provider.embedding_model);
    match config.provider.api_key() {
        Ok(_) => println!("   ✅ API key: ${} is set", config.provider.api_key_env),
        Err(e) => println!("   ❌ API key: {}", e),
    }

    println!();
    println!("🔍 Vector Database:");
    let store = match VectorStore::open(&config).await {
        Ok(store) => {
            println!("   ✅ LanceDB: {}", store.path().display());
            store
        }
        Err(e) => {
            println!("   ❌ LanceDB: Failed to open - {}", e);
            return Ok(());
        }
    };

    for name in [&config.retrieval.index_name, &config.notes.index_name] {
        match store.open_index(name).await {
            Ok(index) => {
                let count = index.count().await?;
                println!(
                    "   📚 {}: {} passages, {} dimensions",
                    name,
                    count,
                    index.dimension()
                );
            }
            Err(crate::ChatError::IndexMissing { .. }) => {
                println!("   ⏳ {}: not built yet", name);
            }
            Err(e) => println!("   ❌ {}: {}", name, e),
        }
    }

    Ok(())
}
