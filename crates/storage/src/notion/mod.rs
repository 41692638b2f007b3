//! Store adapters backed by a Notion-style document database.
//!
//! The remote API is data-source based: a database id resolves to one or
//! more data sources, and pages are queried per data source. Flashcards
//! and study sessions live in two separate databases whose ids come from
//! configuration.

mod mapping;

use std::collections::HashMap;
use std::env;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use study_core::model::{
    CardId, Flashcard, ReviewStats, SessionId, SessionStatus, StudySession, ValidatedCard,
};

use crate::repository::{
    CardStore, HealthReport, SessionStore, StorageError, StoreHealth, Stores,
};

/// API revision required for the multi-source database endpoints.
const NOTION_VERSION: &str = "2025-09-03";

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const DEFAULT_PAGE_SIZE: u32 = 100;

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct NotionConfig {
    pub token: String,
    pub flashcards_db: String,
    pub sessions_db: String,
    pub base_url: String,
    /// Cap on candidate-pool queries; the pool is page-limited by design.
    pub page_size: u32,
}

impl NotionConfig {
    /// Read the adapter configuration from the environment.
    ///
    /// Returns `None` when the token or either database id is absent, in
    /// which case callers fall back to the in-memory backend.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let token = env::var("NOTION_TOKEN").ok()?;
        if token.trim().is_empty() {
            return None;
        }
        let flashcards_db = env::var("NOTION_DB_FLASHCARDS").ok()?;
        let sessions_db = env::var("NOTION_DB_SESSIONS").ok()?;
        let base_url =
            env::var("NOTION_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let page_size = env::var("NOTION_PAGE_SIZE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Some(Self {
            token,
            flashcards_db,
            sessions_db,
            base_url,
            page_size,
        })
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Implements the card and session store contracts over the remote HTTP API.
///
/// The adapter is stateless apart from a per-database data-source id
/// cache; every operation is a single request with no retry logic.
pub struct NotionStore {
    client: Client,
    config: NotionConfig,
    data_sources: Mutex<HashMap<String, String>>,
}

impl NotionStore {
    #[must_use]
    pub fn new(config: NotionConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            data_sources: Mutex::new(HashMap::new()),
        }
    }

    /// Bundle one adapter instance behind the store trait objects.
    #[must_use]
    pub fn into_stores(self) -> Stores {
        let store = std::sync::Arc::new(self);
        Stores {
            cards: store.clone(),
            sessions: store.clone(),
            health: store,
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, StorageError> {
        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        debug!(%method, %url, "store request");

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StorageError::Malformed(e.to_string()))
    }

    /// Resolve and cache the first data-source id of a database.
    async fn data_source_id(&self, database_id: &str) -> Result<String, StorageError> {
        if let Ok(cache) = self.data_sources.lock()
            && let Some(id) = cache.get(database_id)
        {
            return Ok(id.clone());
        }

        let meta = self
            .request(Method::GET, &format!("databases/{database_id}"), None)
            .await?;
        let id = mapping::first_data_source_id(&meta)?;

        if let Ok(mut cache) = self.data_sources.lock() {
            cache.insert(database_id.to_string(), id.clone());
        }
        Ok(id)
    }

    async fn query(&self, database_id: &str, body: Value) -> Result<Vec<Value>, StorageError> {
        let data_source_id = self.data_source_id(database_id).await?;
        let result = self
            .request(
                Method::POST,
                &format!("data_sources/{data_source_id}/query"),
                Some(&body),
            )
            .await?;

        match result.get("results").and_then(Value::as_array) {
            Some(pages) => Ok(pages.clone()),
            None => Err(StorageError::Malformed(
                "query response missing results".into(),
            )),
        }
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
    ) -> Result<String, StorageError> {
        let data_source_id = self.data_source_id(database_id).await?;
        let body = json!({
            "parent": { "type": "data_source_id", "data_source_id": data_source_id },
            "properties": properties,
        });
        let page = self.request(Method::POST, "pages", Some(&body)).await?;
        mapping::page_id(&page)
    }

    async fn update_page(&self, page_id: &str, properties: Value) -> Result<(), StorageError> {
        let body = json!({ "properties": properties });
        self.request(Method::PATCH, &format!("pages/{page_id}"), Some(&body))
            .await?;
        Ok(())
    }
}

//
// ─── TRAIT IMPLS ───────────────────────────────────────────────────────────────
//

#[async_trait]
impl CardStore for NotionStore {
    async fn list_cards(&self, language: Option<&str>) -> Result<Vec<Flashcard>, StorageError> {
        let mut body = json!({ "page_size": self.config.page_size });
        if let Some(language) = language {
            body["filter"] = json!({
                "property": "Language",
                "select": { "equals": language },
            });
        }

        let pages = self.query(&self.config.flashcards_db, body).await?;
        pages.iter().map(mapping::card_from_page).collect()
    }

    async fn get_card(&self, id: &CardId) -> Result<Flashcard, StorageError> {
        let page = self
            .request(Method::GET, &format!("pages/{id}"), None)
            .await?;
        mapping::card_from_page(&page)
    }

    async fn update_card_stats(
        &self,
        id: &CardId,
        stats: &ReviewStats,
    ) -> Result<(), StorageError> {
        self.update_page(id.as_str(), mapping::stats_properties(stats))
            .await
    }

    async fn create_card(&self, draft: ValidatedCard) -> Result<Flashcard, StorageError> {
        let properties = mapping::card_properties(&draft);
        let page_id = self
            .create_page(&self.config.flashcards_db, properties)
            .await?;
        Ok(draft.assign_id(CardId::new(page_id)))
    }
}

#[async_trait]
impl SessionStore for NotionStore {
    async fn find_active(&self) -> Result<Option<StudySession>, StorageError> {
        let body = json!({
            "filter": {
                "property": "Status",
                "select": { "equals": SessionStatus::Started.as_str() },
            },
            "sorts": [
                { "property": "Start Time", "direction": "descending" },
            ],
            "page_size": 1,
        });

        let pages = self.query(&self.config.sessions_db, body).await?;
        match pages.first() {
            Some(page) => Ok(Some(mapping::session_from_page(page)?)),
            None => Ok(None),
        }
    }

    async fn create_session(
        &self,
        started_at: DateTime<Utc>,
    ) -> Result<StudySession, StorageError> {
        let properties = mapping::session_properties(started_at);
        let page_id = self
            .create_page(&self.config.sessions_db, properties)
            .await?;
        Ok(StudySession::started(SessionId::new(page_id), started_at))
    }

    async fn close_session(
        &self,
        id: &SessionId,
        ended_at: DateTime<Utc>,
        duration_min: i64,
    ) -> Result<(), StorageError> {
        self.update_page(id.as_str(), mapping::close_properties(ended_at, duration_min))
            .await
    }
}

#[async_trait]
impl StoreHealth for NotionStore {
    async fn health(&self) -> Result<HealthReport, StorageError> {
        let meta = self
            .request(
                Method::GET,
                &format!("databases/{}", self.config.flashcards_db),
                None,
            )
            .await?;

        Ok(HealthReport {
            backend: "notion",
            detail: mapping::database_title(&meta),
        })
    }
}
