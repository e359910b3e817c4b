use clap::{Parser, Subcommand};
use pdf_chat::Result;
use pdf_chat::commands::{
    ask, chat, mail_send, notes_ask, notes_sync, process_pdfs, qa, show_status, tutor,
};
use pdf_chat::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(about = "Chat with your PDFs and Notion notes using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Use this directory for config.toml and the vector store
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the model provider and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index PDF files, replacing the current PDF index
    Process {
        /// PDF files to index
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Start an interactive chat over the PDF index
    Chat {
        /// PDF files to index before the chat starts
        files: Vec<PathBuf>,
    },
    /// Ask a single question about the indexed PDFs
    Ask {
        question: String,
    },
    /// Ask the model a question without any documents
    Qa {
        question: String,
    },
    /// Start a conversation with the tutor persona
    Tutor,
    /// Index and query a Notion database
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
    /// Have the model write and send an email through Gmail
    Mail {
        #[command(subcommand)]
        command: MailCommands,
    },
    /// Show provider and index status
    Status,
}

#[derive(Subcommand)]
enum NotesCommands {
    /// Pull every page of the Notion database and rebuild the notes index
    Sync,
    /// Ask a question about the synced notes
    Ask { question: String },
}

#[derive(Subcommand)]
enum MailCommands {
    /// Draft an email from a plain-language instruction and send it
    Send {
        instruction: String,
        /// Send without asking for confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(|e| pdf_chat::ChatError::Config(e.to_string()))?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Process { files } => {
            process_pdfs(&config_dir, &files).await?;
        }
        Commands::Chat { files } => {
            chat(&config_dir, &files).await?;
        }
        Commands::Ask { question } => {
            ask(&config_dir, &question).await?;
        }
        Commands::Qa { question } => {
            qa(&config_dir, &question)?;
        }
        Commands::Tutor => {
            tutor(&config_dir)?;
        }
        Commands::Notes { command } => match command {
            NotesCommands::Sync => notes_sync(&config_dir).await?,
            NotesCommands::Ask { question } => notes_ask(&config_dir, &question).await?,
        },
        Commands::Mail { command } => match command {
            MailCommands::Send { instruction, yes } => mail_send(&config_dir, &instruction, yes)?,
        },
        Commands::Status => {
            show_status(&config_dir).await?;
        }
    }

    Ok(())
}
