//! HTTP client for the ingestion service.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use bytes::Bytes;
use async_trait::async_trait;
use intake_core::api::{IngestApi, UploadFile};
use intake_core::error::{Error, Result as IngestResult};
use intake_core::model::{Dataset, DatasetCollection, Table, TableCollection};
use intake_core::observability::Redacted;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::Config;

/// [`IngestApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIngestClient {
    client: Client,
    base_url: Url,
    token: Option<Redacted<String>>,
}

impl HttpIngestClient {
    /// Creates a new API client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid API URL: {}", config.api_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {}", config.api_url);
        }

        Ok(Self {
            client,
            base_url,
            token: config.api_token.clone(),
        })
    }

    /// Builds `<base>/<segments...>`, percent-encoding every segment.
    fn url(&self, segments: &[&str]) -> IngestResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidInput(format!("invalid API URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token.expose()),
            None => req,
        }
    }

    async fn send(&self, operation: &str, req: RequestBuilder) -> IngestResult<Response> {
        let response = req
            .send()
            .await
            .map_err(|e| Error::transport_with_source(format!("{operation} request failed"), e))?;

        let status = response.status();
        debug!(op = operation, %status, "response received");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.map_err(|e| {
            Error::transport_with_source(format!("failed reading {operation} error body"), e)
        })?;
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        Err(Error::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(operation: &str, response: Response) -> IngestResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::malformed(format!("invalid {operation} response: {e}")))
    }

    async fn body(operation: &str, response: Response) -> IngestResult<Bytes> {
        response.bytes().await.map_err(|e| {
            Error::transport_with_source(format!("failed reading {operation} response"), e)
        })
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Prefers a JSON `message` or `detail` field; falls back to the raw text.
fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["message", "detail"] {
            match value.get(key) {
                Some(Value::String(text)) => return Some(text.clone()),
                Some(Value::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Decodes a name-keyed collection; `null` and an empty body mean no entries.
fn decode_collection(operation: &str, body: &[u8]) -> IngestResult<BTreeMap<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::malformed(format!("invalid {operation} response: {e}")))?;
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(Error::malformed(format!(
            "invalid {operation} response: expected an object, got {other}"
        ))),
    }
}

/// Decodes a find-match body; `null`, `{}` and an empty body mean no match.
fn decode_match(body: &[u8]) -> IngestResult<Option<Dataset>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::malformed(format!("invalid find_match response: {e}")))?;
    match &value {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::malformed(format!("invalid find_match response: {e}"))),
    }
}

#[async_trait]
impl IngestApi for HttpIngestClient {
    async fn list_datasets(&self) -> IngestResult<DatasetCollection> {
        let url = self.url(&["datasets"])?;
        let response = self
            .send("list_datasets", self.request(Method::GET, url))
            .await?;
        let body = Self::body("list_datasets", response).await?;
        decode_collection("list_datasets", &body)
    }

    async fn create_dataset(&self, dataset: &Dataset) -> IngestResult<Dataset> {
        let url = self.url(&["datasets"])?;
        let response = self
            .send(
                "create_dataset",
                self.request(Method::POST, url).json(dataset),
            )
            .await?;
        Self::json("create_dataset", response).await
    }

    async fn list_tables(&self, dataset: &str) -> IngestResult<TableCollection> {
        let url = self.url(&[dataset, "tables"])?;
        let response = self
            .send("list_tables", self.request(Method::GET, url))
            .await?;
        let body = Self::body("list_tables", response).await?;
        decode_collection("list_tables", &body)
    }

    async fn get_table(&self, dataset: &str, table: &str) -> IngestResult<Table> {
        let url = self.url(&[dataset, "tables", table])?;
        let response = self.send("get_table", self.request(Method::GET, url)).await?;
        Self::json("get_table", response).await
    }

    async fn update_table(&self, dataset: &str, table: &str, schema: &Table) -> IngestResult<Table> {
        let url = self.url(&[dataset, "tables", table])?;
        let response = self
            .send("update_table", self.request(Method::PUT, url).json(schema))
            .await?;
        Self::json("update_table", response).await
    }

    async fn upload_file(
        &self,
        filename: &str,
        file: &UploadFile,
        metadata: Option<&str>,
    ) -> IngestResult<Value> {
        let data = file.read().await?;
        let mut form = Form::new().part(
            "file",
            Part::stream(data).file_name(file.name().to_string()),
        );
        if let Some(metadata) = metadata {
            form = form.text("metadata", metadata.to_string());
        }

        let url = self.url(&["upload", filename])?;
        let response = self
            .send("upload_file", self.request(Method::POST, url).multipart(form))
            .await?;
        let body = Self::body("upload_file", response).await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body)
            .map_err(|e| Error::malformed(format!("invalid upload_file response: {e}")))
    }

    async fn find_match(&self, filename: &str) -> IngestResult<Option<Dataset>> {
        let url = self.url(&["findmatch", filename])?;
        let response = self
            .send("find_match", self.request(Method::GET, url))
            .await?;
        let body = Self::body("find_match", response).await?;
        decode_match(&body)
    }
}
