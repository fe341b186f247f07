//! Batched retrieval from the remote sales API
//!
//! A fetch first asks `{base}/{entity}/count` how many records match the filters, then walks
//! `{base}/{entity}?maxAllowed=..&offset=..` page by page. Pages are requested strictly one
//! after another; the first failure ends the fetch and discards everything received so far.

use crate::config::SalesApiConfig;
use crate::error::{Error, Result};
use crate::types::{Entity, Record};
use serde_json::Value;
use std::num::NonZeroU32;
use tracing::{debug, info, warn};
use url::Url;

mod classify;

pub use classify::{CONNECTION_DETAILS, FetchError, FetchErrorKind, FetchStage, TIMEOUT_DETAILS};

/// Outcome of a complete fetch
pub type FetchResult = std::result::Result<Vec<Record>, FetchError>;

/// Parameters of one fetch
#[derive(Clone, Debug)]
pub struct FetchRequest {
    entity: Entity,
    batch_size: NonZeroU32,
    fields: Vec<String>,
    filters: Vec<(String, String)>,
}

impl FetchRequest {
    /// Request every record of `entity`, `batch_size` records per page
    pub fn new(entity: Entity, batch_size: NonZeroU32) -> Self {
        Self {
            entity,
            batch_size,
            fields: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Restrict the returned fields (sent as a comma-separated `fields` parameter)
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add a filter; filters are sent in the order they were added
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Entity being fetched
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Records per page
    pub fn batch_size(&self) -> NonZeroU32 {
        self.batch_size
    }

    /// Requested fields
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Filters in request order
    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Offsets of the pages needed to read `total` records
    pub fn page_offsets(&self, total: u64) -> impl Iterator<Item = u64> {
        let step = usize::try_from(self.batch_size.get()).unwrap_or(usize::MAX);
        (0..total).step_by(step)
    }
}

/// Client for the paginated sales API
#[derive(Clone, Debug)]
pub struct BatchFetcher {
    client: reqwest::Client,
    base: Url,
}

impl BatchFetcher {
    /// Create a fetcher for `{base_url}/{path_prefix}` with the configured request timeout
    pub fn new(config: &SalesApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("daily-basket/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        let mut base = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("sales API URL '{}' is invalid: {}", config.base_url, e),
            key: Some("FOODBASKET_API_URL".to_string()),
        })?;
        {
            let mut segments = base.path_segments_mut().map_err(|_| Error::Config {
                message: format!("sales API URL '{}' cannot be a base", config.base_url),
                key: Some("FOODBASKET_API_URL".to_string()),
            })?;
            segments.pop_if_empty();
            for part in config.path_prefix.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
        }

        Ok(Self { client, base })
    }

    /// Base URL all entity paths are appended to
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetch every record matching `request`
    ///
    /// Returns the records in page order, or the first classified failure. A failure on any
    /// page discards the pages already received.
    #[tracing::instrument(skip(self, request), fields(entity = %request.entity()))]
    pub async fn fetch_all(&self, request: &FetchRequest) -> FetchResult {
        let total = self.fetch_count(request).await?;
        info!(total, "Found {} {} records", total, request.entity());

        let mut records = Vec::new();
        for offset in request.page_offsets(total) {
            let page = self.fetch_page(request, offset).await?;
            debug!(offset, received = page.len(), "Fetched page");
            records.extend(page);
        }

        info!(received = records.len(), "Fetch complete");
        Ok(records)
    }

    async fn fetch_count(&self, request: &FetchRequest) -> std::result::Result<u64, FetchError> {
        let entity = request.entity();
        let stage = FetchStage::Count;

        let mut url = self.endpoint(entity, true);
        if !request.filters().is_empty() {
            url.query_pairs_mut().extend_pairs(request.filters());
        }

        let (body, value) = self.get_json(url, entity, stage).await?;
        match value.get("data").and_then(Value::as_u64) {
            Some(total) => Ok(total),
            None => {
                let err = classify::malformed("data", &body, entity, stage);
                warn!(error = %err, "Count response malformed");
                Err(err)
            }
        }
    }

    async fn fetch_page(
        &self,
        request: &FetchRequest,
        offset: u64,
    ) -> std::result::Result<Vec<Record>, FetchError> {
        let entity = request.entity();
        let stage = FetchStage::Page { offset };

        let mut url = self.endpoint(entity, false);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("maxAllowed", &request.batch_size().to_string())
                .append_pair("offset", &offset.to_string());
            query.extend_pairs(request.filters());
            if !request.fields().is_empty() {
                query.append_pair("fields", &request.fields().join(","));
            }
        }

        let (body, value) = self.get_json(url, entity, stage).await?;
        let Some(data) = value.get("data").and_then(Value::as_object) else {
            let err = classify::malformed("data", &body, entity, stage);
            warn!(offset, error = %err, "Page response malformed");
            return Err(err);
        };

        let key = entity.envelope_key();
        match data.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record.clone()),
                    _ => Err(classify::malformed(key, &body, entity, stage)),
                })
                .collect(),
            Some(_) => Err(classify::malformed(key, &body, entity, stage)),
        }
    }

    /// GET `url` and parse the body as JSON, classifying every failure
    async fn get_json(
        &self,
        url: Url,
        entity: Entity,
        stage: FetchStage,
    ) -> std::result::Result<(String, Value), FetchError> {
        debug!(%url, "Requesting");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = classify::transport_failure(&e, entity, stage);
                warn!(error = %e, kind = ?err.kind, "{}", err.message);
                return Err(err);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let err = classify::transport_failure(&e, entity, stage);
                warn!(error = %e, kind = ?err.kind, "{}", err.message);
                return Err(err);
            }
        };

        if !status.is_success() {
            let err = classify::rejected_status(status, &body, entity, stage);
            warn!(status = status.as_u16(), "{}", err.message);
            return Err(err);
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok((body, value)),
            Err(_) => Err(classify::malformed("data", &body, entity, stage)),
        }
    }

    fn endpoint(&self, entity: Entity, count: bool) -> Url {
        let mut url = self.base.clone();
        // `new` rejected cannot-be-a-base URLs, so segments are always available here
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(entity.as_str());
            if count {
                segments.push("count");
            }
        }
        url
    }
}
