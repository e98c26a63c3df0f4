//! Minimal Notion API client.
//!
//! This crate provides a focused client for the pieces of the Notion API
//! the dashboard needs:
//! - Paginated block-children listing and database queries
//! - Block creation, text/equation updates, and deletion
//! - Database discovery through the search endpoint
//!
//! All calls are issued sequentially; pagination is a plain cursor loop.
//! Non-success responses surface the raw status and body to the caller
//! rather than a typed service error.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

const API_BASE: &str = "https://api.notion.com/v1";
const API_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// Errors that can occur when using the Notion client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Integration token not configured")]
    NoToken,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Notion API client.
#[derive(Clone)]
pub struct Notion {
    client: reqwest::Client,
    token: String,
}

impl Notion {
    /// Create a new client with the given integration token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            token: token.into(),
        }
    }

    /// Create a client from the NOTION_TOKEN environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let token = std::env::var("NOTION_TOKEN").map_err(|_| Error::NoToken)?;
        Ok(Self::new(token))
    }

    /// Fetch one page of a block's direct children.
    pub async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Block>, Error> {
        let mut query = vec![("page_size".to_string(), PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor".to_string(), cursor.to_string()));
        }

        let response = self
            .client
            .get(format!("{API_BASE}/blocks/{block_id}/children"))
            .headers(self.build_headers()?)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = expect_success(response).await?;

        let list: ApiList<ApiBlock> = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(Page {
            items: list.results.into_iter().map(block_from_api).collect(),
            next_cursor: if list.has_more { list.next_cursor } else { None },
        })
    }

    /// Fetch all of a block's direct children, following the cursor until
    /// the service reports no more pages.
    pub async fn list_all_children(&self, block_id: &str) -> Result<Vec<Block>, Error> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_children(block_id, cursor.as_deref()).await?;
            blocks.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(blocks)
    }

    /// Query every record in a database, following pagination.
    pub async fn query_records(&self, database_id: &str) -> Result<Vec<Record>, Error> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response = self
                .client
                .post(format!("{API_BASE}/databases/{database_id}/query"))
                .headers(self.build_headers()?)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
            let response = expect_success(response).await?;

            let list: ApiList<ApiRecord> = response
                .json()
                .await
                .map_err(|e| Error::Parse(e.to_string()))?;

            records.extend(list.results.into_iter().map(record_from_api));
            if !list.has_more {
                break;
            }
            match list.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(records)
    }

    /// Retrieve a single block.
    pub async fn retrieve_block(&self, block_id: &str) -> Result<Block, Error> {
        let response = self
            .client
            .get(format!("{API_BASE}/blocks/{block_id}"))
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = expect_success(response).await?;

        let api: ApiBlock = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;
        Ok(block_from_api(api))
    }

    /// Append new child blocks to a parent and return the created blocks.
    pub async fn append_children(
        &self,
        parent_id: &str,
        children: &[NewBlock],
    ) -> Result<Vec<Block>, Error> {
        let body = json!({
            "children": children.iter().map(NewBlock::to_json).collect::<Vec<_>>(),
        });

        let response = self
            .client
            .patch(format!("{API_BASE}/blocks/{parent_id}/children"))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = expect_success(response).await?;

        let list: ApiList<ApiBlock> = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(list.results.into_iter().map(block_from_api).collect())
    }

    /// Replace a block's rich text with a single plain-text run.
    pub async fn update_text(&self, block_id: &str, kind: &str, text: &str) -> Result<(), Error> {
        let body = json!({
            kind: {
                "rich_text": [
                    { "type": "text", "text": { "content": text } }
                ]
            }
        });
        self.patch_block(block_id, body).await
    }

    /// Replace a block's rich text with a single inline equation.
    pub async fn update_equation(
        &self,
        block_id: &str,
        kind: &str,
        expression: &str,
    ) -> Result<(), Error> {
        let body = json!({
            kind: {
                "rich_text": [
                    { "type": "equation", "equation": { "expression": expression } }
                ]
            }
        });
        self.patch_block(block_id, body).await
    }

    /// Delete (archive) a block.
    pub async fn delete_block(&self, block_id: &str) -> Result<(), Error> {
        let response = self
            .client
            .delete(format!("{API_BASE}/blocks/{block_id}"))
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        expect_success(response).await?;
        Ok(())
    }

    /// Find the first shared database whose title contains the given text.
    pub async fn find_collection(&self, title_fragment: &str) -> Result<Option<Collection>, Error> {
        let mut cursor: Option<String> = None;
        loop {
            let mut body = json!({
                "filter": { "value": "database", "property": "object" },
                "page_size": PAGE_SIZE,
            });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response = self
                .client
                .post(format!("{API_BASE}/search"))
                .headers(self.build_headers()?)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
            let response = expect_success(response).await?;

            let list: ApiList<ApiSearchResult> = response
                .json()
                .await
                .map_err(|e| Error::Parse(e.to_string()))?;

            for result in list.results {
                let title = rich_text_plain(&Value::Array(result.title));
                if title.contains(title_fragment) {
                    return Ok(Some(Collection {
                        id: result.id,
                        title,
                    }));
                }
            }
            if !list.has_more {
                return Ok(None);
            }
            match list.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(None),
            }
        }
    }

    async fn patch_block(&self, block_id: &str, body: Value) -> Result<(), Error> {
        let response = self
            .client
            .patch(format!("{API_BASE}/blocks/{block_id}"))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        expect_success(response).await?;
        Ok(())
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|e| Error::Config(format!("Invalid token: {e}")))?,
        );
        headers.insert("Notion-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(status, body = %body, "non-success response");
        Err(Error::Api {
            status,
            message: body,
        })
    }
}

// ============================================================================
// Public types
// ============================================================================

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page, or `None` when the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// One node in the remote document tree.
///
/// The per-type payload is flattened into the two text fields the dashboard
/// cares about; blocks are never cached beyond a single scan pass.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: String,
    /// The block's type tag ("paragraph", "callout", "toggle", ...).
    pub kind: String,
    /// Concatenated plain text of the block's rich-text runs.
    pub plain_text: String,
    /// Concatenated expressions of any inline or block-level equations.
    pub equation_text: String,
    pub has_children: bool,
}

impl Block {
    /// The probe string content signatures are evaluated against.
    pub fn probe_text(&self) -> String {
        if self.equation_text.is_empty() {
            self.plain_text.clone()
        } else {
            format!("{} {}", self.plain_text, self.equation_text)
        }
    }
}

/// One item in a structured collection, with an unordered property map.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    /// Service-assigned creation timestamp (ISO 8601).
    pub created_time: String,
    /// The record's emoji icon, when it has one.
    pub icon_emoji: Option<String>,
    pub properties: HashMap<String, PropertyValue>,
}

/// A typed property value. Only the types the dashboard reads are carried;
/// everything else collapses to `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Date { start: Option<String> },
    Title { text: String },
    CreatedTime { timestamp: String },
    Other,
}

/// A discovered database.
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: String,
    pub title: String,
}

/// A block to be created through `append_children`.
#[derive(Debug, Clone)]
pub enum NewBlock {
    Paragraph {
        text: String,
    },
    Heading {
        text: String,
    },
    Callout {
        text: String,
        emoji: String,
        children: Vec<NewBlock>,
    },
    Toggle {
        text: String,
        children: Vec<NewBlock>,
    },
    Equation {
        expression: String,
    },
}

impl NewBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        NewBlock::Paragraph { text: text.into() }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        NewBlock::Heading { text: text.into() }
    }

    pub fn callout(text: impl Into<String>, emoji: impl Into<String>) -> Self {
        NewBlock::Callout {
            text: text.into(),
            emoji: emoji.into(),
            children: Vec::new(),
        }
    }

    pub fn toggle(text: impl Into<String>, children: Vec<NewBlock>) -> Self {
        NewBlock::Toggle {
            text: text.into(),
            children,
        }
    }

    pub fn equation(expression: impl Into<String>) -> Self {
        NewBlock::Equation {
            expression: expression.into(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            NewBlock::Paragraph { text } => json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": [text_run(text)] }
            }),
            NewBlock::Heading { text } => json!({
                "object": "block",
                "type": "heading_1",
                "heading_1": { "rich_text": [text_run(text)] }
            }),
            NewBlock::Callout {
                text,
                emoji,
                children,
            } => {
                let mut callout = json!({
                    "rich_text": [text_run(text)],
                    "icon": { "type": "emoji", "emoji": emoji },
                    "color": "gray_background"
                });
                if !children.is_empty() {
                    callout["children"] =
                        Value::Array(children.iter().map(NewBlock::to_json).collect());
                }
                json!({ "object": "block", "type": "callout", "callout": callout })
            }
            NewBlock::Toggle { text, children } => {
                let mut toggle = json!({ "rich_text": [text_run(text)] });
                if !children.is_empty() {
                    toggle["children"] =
                        Value::Array(children.iter().map(NewBlock::to_json).collect());
                }
                json!({ "object": "block", "type": "toggle", "toggle": toggle })
            }
            NewBlock::Equation { expression } => json!({
                "object": "block",
                "type": "equation",
                "equation": { "expression": expression }
            }),
        }
    }
}

fn text_run(text: &str) -> Value {
    json!({ "type": "text", "text": { "content": text } })
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiList<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBlock {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    payload: HashMap<String, Value>,
}

fn block_from_api(api: ApiBlock) -> Block {
    let body = api.payload.get(&api.kind).cloned().unwrap_or(Value::Null);

    let mut plain_text = String::new();
    let mut equation_text = String::new();

    if api.kind == "equation" {
        if let Some(expr) = body.get("expression").and_then(Value::as_str) {
            equation_text.push_str(expr);
        }
    } else if let Some(runs) = body.get("rich_text").and_then(Value::as_array) {
        for run in runs {
            match run.get("type").and_then(Value::as_str) {
                Some("equation") => {
                    if let Some(expr) = run
                        .pointer("/equation/expression")
                        .and_then(Value::as_str)
                    {
                        equation_text.push_str(expr);
                    }
                }
                _ => plain_text.push_str(plain_text_of(run)),
            }
        }
    }

    Block {
        id: api.id,
        kind: api.kind,
        plain_text,
        equation_text,
        has_children: api.has_children,
    }
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(default)]
    created_time: String,
    #[serde(default)]
    icon: Option<Value>,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

fn record_from_api(api: ApiRecord) -> Record {
    let icon_emoji = api.icon.as_ref().and_then(|icon| {
        if icon.get("type").and_then(Value::as_str) == Some("emoji") {
            icon.get("emoji").and_then(Value::as_str).map(String::from)
        } else {
            None
        }
    });

    let properties = api
        .properties
        .into_iter()
        .map(|(name, value)| (name, property_from_api(&value)))
        .collect();

    Record {
        id: api.id,
        created_time: api.created_time,
        icon_emoji,
        properties,
    }
}

fn property_from_api(value: &Value) -> PropertyValue {
    match value.get("type").and_then(Value::as_str) {
        Some("date") => PropertyValue::Date {
            start: value
                .pointer("/date/start")
                .and_then(Value::as_str)
                .map(String::from),
        },
        Some("title") => PropertyValue::Title {
            text: value
                .get("title")
                .map(rich_text_plain)
                .unwrap_or_default(),
        },
        Some("created_time") => PropertyValue::CreatedTime {
            timestamp: value
                .get("created_time")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        _ => PropertyValue::Other,
    }
}

#[derive(Debug, Deserialize)]
struct ApiSearchResult {
    id: String,
    #[serde(default)]
    title: Vec<Value>,
}

fn rich_text_plain(runs: &Value) -> String {
    match runs.as_array() {
        Some(runs) => runs.iter().map(|run| plain_text_of(run).to_string()).collect(),
        None => String::new(),
    }
}

fn plain_text_of(run: &Value) -> &str {
    run.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| run.pointer("/text/content").and_then(Value::as_str))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Notion::new("secret-token");
        assert_eq!(client.token, "secret-token");
        assert!(client.build_headers().is_ok());
    }

    #[test]
    fn test_block_from_api_concatenates_text_and_equations() {
        let api: ApiBlock = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "type": "callout",
            "has_children": true,
            "callout": {
                "rich_text": [
                    { "type": "text", "plain_text": "Age: ", "text": { "content": "Age: " } },
                    { "type": "equation", "equation": { "expression": "D+42" } },
                ]
            }
        }))
        .unwrap();

        let block = block_from_api(api);
        assert_eq!(block.kind, "callout");
        assert_eq!(block.plain_text, "Age: ");
        assert_eq!(block.equation_text, "D+42");
        assert!(block.has_children);
        assert_eq!(block.probe_text(), "Age:  D+42");
    }

    #[test]
    fn test_block_from_api_equation_block() {
        let api: ApiBlock = serde_json::from_value(serde_json::json!({
            "id": "b2",
            "type": "equation",
            "equation": { "expression": "\\texttt{hello}" }
        }))
        .unwrap();

        let block = block_from_api(api);
        assert_eq!(block.plain_text, "");
        assert_eq!(block.equation_text, "\\texttt{hello}");
        assert_eq!(block.probe_text(), "\\texttt{hello}");
    }

    #[test]
    fn test_record_from_api_properties() {
        let api: ApiRecord = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "created_time": "2026-02-01T09:30:00.000Z",
            "icon": { "type": "emoji", "emoji": "💊" },
            "properties": {
                "Name": { "type": "title", "title": [
                    { "plain_text": "Vet " }, { "plain_text": "visit" }
                ] },
                "Date": { "type": "date", "date": { "start": "2026-02-03" } },
                "Weight": { "type": "number", "number": 4.2 },
            }
        }))
        .unwrap();

        let record = record_from_api(api);
        assert_eq!(record.icon_emoji.as_deref(), Some("💊"));
        assert_eq!(
            record.properties.get("Name"),
            Some(&PropertyValue::Title {
                text: "Vet visit".to_string()
            })
        );
        assert_eq!(
            record.properties.get("Date"),
            Some(&PropertyValue::Date {
                start: Some("2026-02-03".to_string())
            })
        );
        assert_eq!(record.properties.get("Weight"), Some(&PropertyValue::Other));
    }

    #[test]
    fn test_new_block_payloads() {
        let callout = NewBlock::callout("Age: loading", "🐶").to_json();
        assert_eq!(callout["type"], "callout");
        assert_eq!(callout["callout"]["icon"]["emoji"], "🐶");
        assert_eq!(
            callout["callout"]["rich_text"][0]["text"]["content"],
            "Age: loading"
        );
        assert!(callout["callout"].get("children").is_none());

        let toggle = NewBlock::toggle(
            "⚙️ Settings",
            vec![NewBlock::paragraph("Name: Milk")],
        )
        .to_json();
        assert_eq!(toggle["type"], "toggle");
        assert_eq!(
            toggle["toggle"]["children"][0]["paragraph"]["rich_text"][0]["text"]["content"],
            "Name: Milk"
        );
    }

    #[test]
    fn test_list_page_cursor_only_when_more() {
        let list: ApiList<ApiBlock> = serde_json::from_value(serde_json::json!({
            "results": [],
            "has_more": false,
            "next_cursor": "stale-cursor"
        }))
        .unwrap();
        // Mirrors list_children: an exhausted listing must not loop again.
        let cursor = if list.has_more { list.next_cursor } else { None };
        assert!(cursor.is_none());
    }
}
