// Notion loader
// Pulls every page of a Notion database as a document for the notes bot

#[cfg(test)]
mod tests;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::config::NotesConfig;
use crate::extractor::Document;
use crate::provider::{ProviderError, build_agent, parse_base_url};

const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// A database row: its page id and title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionPage {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<PageObject>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageObject {
    id: String,
    #[serde(default)]
    properties: HashMap<String, PropertyValue>,
}

#[derive(Debug, Deserialize)]
struct PropertyValue {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
}

#[derive(Debug, Deserialize)]
struct BlockList {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

impl PageObject {
    fn title(&self) -> Option<String> {
        self.properties
            .values()
            .find(|property| property.kind == "title")
            .map(|property| {
                property
                    .title
                    .iter()
                    .map(|t| t.plain_text.as_str())
                    .collect::<String>()
            })
            .filter(|title| !title.trim().is_empty())
    }
}

/// Text of one block, from the `rich_text` of its type-specific payload
fn block_text(block: &Value) -> Option<String> {
    let kind = block.get("type")?.as_str()?;
    let rich_text = block.get(kind)?.get("rich_text")?.as_array()?;
    let text: String = rich_text
        .iter()
        .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Id of a block whose children must be fetched separately
fn nested_block_id(block: &Value) -> Option<&str> {
    if block.get("has_children").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    block.get("id")?.as_str()
}

#[derive(Debug, Clone)]
pub struct NotionClient {
    api_base: Url,
    token: String,
    agent: ureq::Agent,
}

impl NotionClient {
    /// Create a client, reading the integration token from the environment
    #[inline]
    pub fn new(config: &NotesConfig) -> Result<Self, ProviderError> {
        let token = config.token()?;
        Self::with_token(config, token)
    }

    #[inline]
    pub fn with_token(config: &NotesConfig, token: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            api_base: parse_base_url(&config.api_base)?,
            token: token.into(),
            agent: build_agent(Some(Duration::from_secs(config.request_timeout_secs))),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.api_base
            .join(path)
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid endpoint: {}", e)))
    }

    fn read<R: DeserializeOwned>(
        &self,
        url: &Url,
        result: Result<String, ureq::Error>,
    ) -> Result<R, ProviderError> {
        let body = result.map_err(|e| {
            error!("Notion request to {} failed: {}", url, e);
            ProviderError::from(e)
        })?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", url.path(), e)))
    }

    fn post<R: DeserializeOwned>(&self, url: &Url, body: &Value) -> Result<R, ProviderError> {
        debug!("POST {}", url);
        let result = self
            .agent
            .post(url.as_str())
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .header("Content-Type", "application/json")
            .send(&body.to_string())
            .and_then(|mut resp| resp.body_mut().read_to_string());
        self.read(url, result)
    }

    fn get<R: DeserializeOwned>(&self, url: &Url) -> Result<R, ProviderError> {
        debug!("GET {}", url);
        let result = self
            .agent
            .get(url.as_str())
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string());
        self.read(url, result)
    }

    /// Every page in the database, following pagination to the end
    #[inline]
    pub fn query_database(&self, database_id: &str) -> Result<Vec<NotionPage>, ProviderError> {
        let url = self.endpoint(&format!("v1/databases/{}/query", database_id))?;
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response: QueryResponse = self.post(&url, &body)?;
            pages.extend(response.results.into_iter().map(|page| NotionPage {
                title: page.title().unwrap_or_else(|| page.id.clone()),
                id: page.id,
            }));

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        info!("Found {} pages in Notion database", pages.len());
        Ok(pages)
    }

    /// Plain text of a page, one line per block. Children of nested blocks
    /// follow their parent, indented by one tab per level.
    #[inline]
    pub fn page_text(&self, page_id: &str) -> Result<String, ProviderError> {
        Ok(self.block_lines(page_id, 0)?.join("\n"))
    }

    fn block_lines(&self, block_id: &str, depth: usize) -> Result<Vec<String>, ProviderError> {
        let mut lines = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = self.endpoint(&format!("v1/blocks/{}/children", block_id))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("page_size", &PAGE_SIZE.to_string());
                if let Some(cursor) = &cursor {
                    query.append_pair("start_cursor", cursor);
                }
            }

            let response: BlockList = self.get(&url)?;
            for block in &response.results {
                if let Some(text) = block_text(block) {
                    lines.push(format!("{}{}", "\t".repeat(depth), text));
                }
                if let Some(child_id) = nested_block_id(block) {
                    lines.extend(self.block_lines(child_id, depth + 1)?);
                }
            }

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(lines)
    }

    /// Load every page of the database as a single-page document named by its title
    #[inline]
    pub fn load_documents(&self, database_id: &str) -> Result<Vec<Document>, ProviderError> {
        self.query_database(database_id)?
            .into_iter()
            .map(|page| {
                let text = self.page_text(&page.id)?;
                debug!("Loaded page '{}' ({} chars)", page.title, text.len());
                Ok(Document::from_pages(page.title, [text]))
            })
            .collect()
    }
}
