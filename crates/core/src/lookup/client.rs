//! HTTP client for the BoardGameGeek XML API.

use std::{future::Future, io::Cursor, time::Duration};

use futures::TryStreamExt;
use image::ImageFormat;
use reqwest::Url;
use tracing::{debug, info};

use super::{
    details::{DetailsScanner, GameDetails},
    scan::{scan_stream, ByteStream},
    search::{SearchHit, SearchScanner},
};
use crate::{config::LookupConfig, error::LookupError};

/// Transport used by [`BggClient`]. Resolves to the streamed response body.
pub trait HttpFetch: Send + Sync + 'static {
    /// Issue a GET request.
    fn get(&self, url: Url) -> impl Future<Output = Result<ByteStream, LookupError>> + Send;
}

/// [`HttpFetch`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Build a client, optionally bounding each request.
    pub fn new(timeout: Option<Duration>) -> Result<Self, LookupError> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("meeple/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: Url) -> Result<ByteStream, LookupError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Box::pin(
            response.bytes_stream().map_err(std::io::Error::other),
        ))
    }
}

/// A downloaded cover, re-encoded as PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverImage {
    /// Where the image was downloaded from.
    pub url: String,
    /// PNG bytes.
    pub png: Vec<u8>,
}

/// Search, detail and cover requests against the configured endpoints.
#[derive(Debug)]
pub struct BggClient<F = ReqwestFetch> {
    fetch: F,
    search_endpoint: String,
    thing_endpoint: String,
}

impl BggClient {
    /// Client using `reqwest` with the configured timeout.
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        Ok(Self::with_fetch(ReqwestFetch::new(config.timeout())?, config))
    }
}

impl<F: HttpFetch> BggClient<F> {
    /// Client using a custom transport.
    pub fn with_fetch(fetch: F, config: &LookupConfig) -> Self {
        Self {
            fetch,
            search_endpoint: config.search_endpoint.clone(),
            thing_endpoint: config.thing_endpoint.clone(),
        }
    }

    /// Search by name: exact matches first, then a single fuzzy retry when
    /// the exact search found nothing.
    pub async fn search(&self, name: &str) -> Result<Vec<SearchHit>, LookupError> {
        let hits = self.search_once(name, true).await?;
        if !hits.is_empty() {
            return Ok(hits);
        }
        debug!(query = name, "No exact match, retrying fuzzy search");
        self.search_once(name, false).await
    }

    async fn search_once(&self, name: &str, exact: bool) -> Result<Vec<SearchHit>, LookupError> {
        let url = Url::parse_with_params(
            &self.search_endpoint,
            &[
                ("query", name),
                ("type", "boardgame"),
                ("exact", if exact { "1" } else { "0" }),
            ],
        )?;
        let body = self.fetch.get(url).await?;
        let hits = scan_stream(body, SearchScanner::default()).await?;
        info!(query = name, exact, hits = hits.len(), "Search finished");
        Ok(hits)
    }

    /// Fetch the detail fields of one item.
    pub async fn details(&self, id: u64) -> Result<GameDetails, LookupError> {
        let url = Url::parse_with_params(
            &self.thing_endpoint,
            &[("id", id.to_string().as_str()), ("stats", "1")],
        )?;
        let body = self.fetch.get(url).await?;
        let details = scan_stream(body, DetailsScanner::default()).await?;
        debug!(id, ?details, "Item details parsed");
        Ok(details)
    }

    /// Download and decode a cover. Any failure yields `None`.
    pub async fn cover(&self, url: &str) -> Option<CoverImage> {
        match self.download_cover(url).await {
            Ok(cover) => Some(cover),
            Err(err) => {
                debug!(url, error = %err, "Cover unavailable");
                None
            }
        }
    }

    async fn download_cover(&self, url: &str) -> anyhow::Result<CoverImage> {
        let mut body = self.fetch.get(Url::parse(url)?).await?;
        let mut bytes = Vec::new();
        while let Some(chunk) = body.try_next().await? {
            bytes.extend_from_slice(&chunk);
        }

        let png = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
            let image = image::load_from_memory(&bytes)?;
            let mut png = Cursor::new(Vec::new());
            image.write_to(&mut png, ImageFormat::Png)?;
            Ok(png.into_inner())
        })
        .await??;

        Ok(CoverImage {
            url: url.to_string(),
            png,
        })
    }
}
