//! GitHub gist ledger source.
//!
//! Every file in the gist whose name ends in `.json` is one transaction
//! collection. Files GitHub truncates in the API response are fetched from
//! their `raw_url`.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::LedgerSource;
use crate::models::RawTransaction;

const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GistResponse {
    files: BTreeMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

pub struct GistLedgerSource {
    client: reqwest::Client,
    gist_id: String,
    token: Option<SecretString>,
    base_url: String,
}

impl GistLedgerSource {
    pub fn new(gist_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gist_id: gist_id.into(),
            token: None,
            base_url: GITHUB_API_BASE.to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Authenticate requests, which raises GitHub's rate limit and allows
    /// reading secret gists.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Point at a different API host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("hodlbook/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header(
                AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    async fn file_content(&self, name: &str, file: GistFile) -> Result<String> {
        match (file.content, file.truncated, file.raw_url) {
            (Some(content), false, _) => Ok(content),
            (_, _, Some(raw_url)) => {
                debug!(file = name, "Fetching truncated gist file");
                self.get(&raw_url)
                    .send()
                    .await?
                    .error_for_status()
                    .with_context(|| format!("Failed to fetch gist file {name}"))?
                    .text()
                    .await
                    .with_context(|| format!("Failed to read gist file {name}"))
            }
            (Some(content), true, None) => Ok(content),
            (None, _, None) => Err(anyhow!("Gist file {name} has neither content nor raw_url")),
        }
    }
}

#[async_trait::async_trait]
impl LedgerSource for GistLedgerSource {
    async fn fetch_collections(&self) -> Result<Vec<Vec<RawTransaction>>> {
        let url = format!("{}/gists/{}", self.base_url, self.gist_id);
        let gist: GistResponse = self
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()
            .with_context(|| format!("Gist {} could not be fetched", self.gist_id))?
            .json()
            .await
            .context("Failed to decode gist response")?;

        let mut collections = Vec::new();
        for (name, file) in gist.files {
            if !name.ends_with(".json") {
                debug!(file = %name, "Skipping non-JSON gist file");
                continue;
            }
            let content = self.file_content(&name, file).await?;
            let collection: Vec<RawTransaction> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON from gist file {name}"))?;
            debug!(file = %name, records = collection.len(), "Loaded gist file");
            collections.push(collection);
        }
        Ok(collections)
    }

    fn name(&self) -> &str {
        "gist"
    }
}
