// Pipeline module
// Named stages from documents to answers, and the session they run in

pub mod composer;
pub mod indexer;
pub mod retriever;


use tracing::{info, warn};

pub use composer::{AnswerComposer, compose_prompt};
pub use indexer::{IndexSummary, Indexer, embed_passages};
pub use retriever::{RankedPassage, Retriever};

use crate::chat::{ChatModel, PromptTemplate, Transcript};
use crate::config::Config;
use crate::database::{IndexHandle, VectorStore};
use crate::embeddings::{Chunker, ChunkingConfig, Embedder};
use crate::extractor::{Document, extract_all, is_empty_input};
use crate::{ChatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No index has been built yet
    Idle,
    /// An index is persisted and questions can be answered
    Ready,
}

/// Per-session state threaded through every pipeline call
#[derive(Debug, Default)]
pub struct SessionContext {
    transcript: Transcript,
    index: Option<IndexHandle>,
}

impl SessionContext {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_index(index: IndexHandle) -> Self {
        Self {
            transcript: Transcript::new(),
            index: Some(index),
        }
    }

    #[inline]
    pub const fn state(&self) -> SessionState {
        if self.index.is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }

    #[inline]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[inline]
    pub const fn index(&self) -> Option<&IndexHandle> {
        self.index.as_ref()
    }

    /// Clear the transcript; the index stays
    #[inline]
    pub fn reset(&mut self) {
        self.transcript.clear();
    }
}

/// What a pipeline indexes and how it answers
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub index_name: String,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub template: PromptTemplate,
}

impl PipelineOptions {
    /// Chat over uploaded PDFs
    #[inline]
    pub fn pdf(config: &Config) -> Self {
        Self {
            index_name: config.retrieval.index_name.clone(),
            chunking: config.chunking,
            top_k: config.retrieval.top_k,
            template: PromptTemplate::pdf_answer(),
        }
    }

    /// Chat over notes pulled from Notion
    #[inline]
    pub fn notes(config: &Config) -> Self {
        Self {
            index_name: config.notes.index_name.clone(),
            chunking: config.notes.chunking(),
            top_k: config.retrieval.top_k,
            template: PromptTemplate::note_taker(),
        }
    }
}

/// Retrieval-augmented question answering over one named index
pub struct RagPipeline<E, M> {
    store: VectorStore,
    embedder: E,
    model: M,
    chunker: Chunker,
    options: PipelineOptions,
}

impl<E: Embedder, M: ChatModel> RagPipeline<E, M> {
    #[inline]
    pub fn new(store: VectorStore, embedder: E, model: M, options: PipelineOptions) -> Result<Self> {
        let chunker = Chunker::from_config(&options.chunking)
            .map_err(|e| ChatError::Config(e.to_string()))?;
        if options.top_k == 0 {
            return Err(ChatError::Config("top_k must be at least 1".to_string()));
        }

        Ok(Self {
            store,
            embedder,
            model,
            chunker,
            options,
        })
    }

    #[inline]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    #[inline]
    pub const fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Start a session, Ready if the index already exists on disk
    #[inline]
    pub async fn open_session(&self) -> Result<SessionContext> {
        match self.store.open_index(&self.options.index_name).await {
            Ok(index) => {
                info!("Resuming with existing index '{}'", index.name());
                Ok(SessionContext::with_index(index))
            }
            Err(ChatError::IndexMissing { .. }) => Ok(SessionContext::new()),
            Err(e) => Err(e),
        }
    }

    /// Extract, chunk, embed and persist `documents`, replacing the index
    ///
    /// Fails with [`ChatError::EmptyInput`] before any provider call when no
    /// document has text. On failure the session keeps its previous state.
    #[inline]
    pub async fn process_documents(
        &self,
        session: &mut SessionContext,
        documents: &[Document],
    ) -> Result<IndexSummary> {
        let texts = extract_all(documents);
        if is_empty_input(&texts) {
            warn!("No extractable text in {} documents", documents.len());
            return Err(ChatError::EmptyInput);
        }

        let passages = self.chunker.chunk_documents(&texts);
        info!(
            "Split {} documents into {} passages",
            documents.len(),
            passages.len()
        );

        let index = Indexer::new(&self.store, &self.embedder)
            .build(&self.options.index_name, &passages)
            .await?;

        let summary = IndexSummary {
            index_name: index.name().to_string(),
            documents: texts.iter().filter(|t| !t.text.trim().is_empty()).count(),
            passages: passages.len(),
            dimension: index.dimension(),
        };
        session.index = Some(index);
        Ok(summary)
    }

    /// Answer a question from the session's index and record the exchange
    #[inline]
    pub async fn ask(&self, session: &mut SessionContext, question: &str) -> Result<String> {
        let Some(index) = session.index.as_ref() else {
            return Err(ChatError::IndexMissing {
                name: self.options.index_name.clone(),
            });
        };

        let answer = self.answer_from(index, question).await?;
        session.transcript.push_exchange(question, answer.clone());
        Ok(answer)
    }

    /// Answer a single question from the persisted index, without a session
    #[inline]
    pub async fn answer_once(&self, question: &str) -> Result<String> {
        let index = self.store.open_index(&self.options.index_name).await?;
        self.answer_from(&index, question).await
    }

    async fn answer_from(&self, index: &IndexHandle, question: &str) -> Result<String> {
        let passages = Retriever::new(&self.embedder, self.options.top_k)
            .retrieve(index, question)
            .await?;
        AnswerComposer::new(&self.model, &self.options.template).answer(&passages, question)
    }
}
