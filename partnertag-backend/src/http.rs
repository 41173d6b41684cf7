//! HTTP client for the statement backend.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use partnertag_core::{
    CategorizationAssignment, CategorizationRecorder, CategoryCatalog, CategorySource,
    PartnerBatch, PartnerSelector, StatementService, StatementSummary,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::wire::{parse_batch, parse_single};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        read_json(resp, &url).await
    }

    async fn post(&self, path: &str, body: Option<&CategorizationAssignment>) -> Result<()> {
        let url = self.url(path);
        debug!(%url, "POST");
        let mut req = self.client.post(&url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.with_context(|| format!("POST {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("POST {url}: {status} {txt}");
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("{url}: {status} {txt}");
    }
    resp.json().await.with_context(|| format!("parse response from {url}"))
}

#[async_trait]
impl PartnerSelector for HttpBackend {
    async fn next_batch(&self, size: usize) -> Result<PartnerBatch> {
        if size == 1 {
            let value: Value = self.get_json("get_next_partner").await?;
            return parse_single(value).context("decode /get_next_partner");
        }
        let value: Value = self.get_json("get_next_partners").await?;
        parse_batch(value, size).context("decode /get_next_partners")
    }
}

#[async_trait]
impl CategorySource for HttpBackend {
    async fn list(&self) -> Result<CategoryCatalog> {
        let value: Value = self.get_json("get_categories").await?;
        Ok(CategoryCatalog::from_json(value).context("decode /get_categories")?)
    }
}

#[async_trait]
impl CategorizationRecorder for HttpBackend {
    async fn record(&self, assignment: &CategorizationAssignment) -> Result<()> {
        self.post("categorize", Some(assignment)).await
    }

    async fn persist(&self) -> Result<()> {
        self.post("save_mapping", None).await
    }
}

#[async_trait]
impl StatementService for HttpBackend {
    async fn upload(&self, statement: &Path) -> Result<StatementSummary> {
        let bytes = tokio::fs::read(statement)
            .await
            .with_context(|| format!("read {}", statement.display()))?;
        let file_name = statement
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "statement.csv".to_string());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let url = self.url("upload_statement");
        debug!(%url, "POST multipart");
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        read_json(resp, &url).await
    }

    async fn insights(&self) -> Result<StatementSummary> {
        self.get_json("get_insights").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let b = HttpBackend::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(b.base_url(), "http://localhost:5000");
        assert_eq!(b.url("get_categories"), "http://localhost:5000/get_categories");
        assert_eq!(b.url("/save_mapping"), "http://localhost:5000/save_mapping");
    }
}
