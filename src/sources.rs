use crate::error::Result;
use crate::types::{BoundingBox, RawEvent, SourceDescriptor, SourceKind};
use async_trait::async_trait;
use futures::future;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DISCOVER_URL: &str = "https://api2.luma.com/discover/get-paginated-events";
const CALENDAR_URL: &str = "https://api2.luma.com/calendar/get-items";

/// One page of a feed response
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub entries: Vec<RawEvent>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Outcome of paginating one source to exhaustion. A transport or decode
/// error ends pagination early but keeps everything fetched so far.
#[derive(Debug)]
pub struct SourceResult {
    pub source_name: String,
    pub events: Vec<RawEvent>,
    pub pages_fetched: usize,
    pub error: Option<String>,
}

/// Seam between the pagination loop and the HTTP transport, so partial
/// failure and cursor handling are testable without a network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        cursor: Option<&str>,
    ) -> Result<PageResponse>;
}

/// Live fetcher against the Luma discover and calendar endpoints
pub struct HttpPageFetcher {
    client: reqwest::Client,
    bounding_box: BoundingBox,
    pagination_limit: u32,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client, bounding_box: BoundingBox, pagination_limit: u32) -> Self {
        Self {
            client,
            bounding_box,
            pagination_limit,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        cursor: Option<&str>,
    ) -> Result<PageResponse> {
        let bbox = self.bounding_box;
        let mut params: Vec<(&str, String)> = vec![
            ("east", bbox.east.to_string()),
            ("north", bbox.north.to_string()),
            ("south", bbox.south.to_string()),
            ("west", bbox.west.to_string()),
            ("pagination_limit", self.pagination_limit.to_string()),
        ];

        let url = match &source.kind {
            SourceKind::Slug { slug } => {
                params.push(("slug", slug.clone()));
                DISCOVER_URL
            }
            SourceKind::Calendar { calendar_api_id } => {
                params.push(("calendar_api_id", calendar_api_id.clone()));
                params.push(("location_required", "true".to_string()));
                params.push(("period", "future".to_string()));
                CALENDAR_URL
            }
        };

        if let Some(cursor) = cursor {
            params.push(("pagination_cursor", cursor.to_string()));
        }

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let page: PageResponse = response.json().await?;
        Ok(page)
    }
}

/// Fetch one source page by page until exhausted, following the rolling
/// cursor. Errors stop the loop and are recorded on the result; already
/// accumulated events are never discarded.
#[instrument(skip(fetcher), fields(source = %source.name))]
pub async fn fetch_source(
    fetcher: &dyn PageFetcher,
    source: &SourceDescriptor,
    delay_ms: u64,
) -> SourceResult {
    let mut events: Vec<RawEvent> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched = 0;
    let mut error = None;

    info!("starting paginated fetch");

    loop {
        match fetcher.fetch_page(source, cursor.as_deref()).await {
            Ok(page) => {
                pages_fetched += 1;
                let page_count = page.entries.len();
                events.extend(page.entries);
                debug!(
                    page = pages_fetched,
                    fetched = page_count,
                    total = events.len(),
                    has_more = page.has_more,
                    "fetched page"
                );

                if !page.has_more {
                    break;
                }
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => {
                        // has_more without a cursor would refetch the same
                        // page forever; treat as a malformed response.
                        warn!("response claimed more pages but carried no cursor; stopping");
                        break;
                    }
                }

                // Inter-page politeness delay; suspends only this source.
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) => {
                warn!(page = pages_fetched + 1, "page fetch failed: {}", e);
                error = Some(e.to_string());
                break;
            }
        }
    }

    info!(
        total = events.len(),
        pages = pages_fetched,
        partial = error.is_some(),
        "finished fetching source"
    );

    SourceResult {
        source_name: source.name.clone(),
        events,
        pages_fetched,
        error,
    }
}

/// Run every source's pagination loop concurrently and collect all results.
/// The output is ordered by input source order regardless of completion
/// order, one entry per source.
pub async fn fetch_all_sources(
    fetcher: &dyn PageFetcher,
    sources: &[SourceDescriptor],
    delay_ms: u64,
) -> Vec<SourceResult> {
    let fetches: Vec<_> = sources
        .iter()
        .map(|source| fetch_source(fetcher, source, delay_ms))
        .collect();

    future::join_all(fetches).await
}
