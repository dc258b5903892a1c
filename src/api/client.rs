// src/api/client.rs
//! Thin HTTP implementation of the backend seam.
//!
//! Wraps reqwest for the handful of farm-backend endpoints. No parsing or
//! business logic lives here beyond turning non-success statuses into the
//! typed error vocabulary; envelope tolerance belongs to the callers.

use super::FarmBackend;
use crate::config::EngineConfig;
use crate::error::{AppError, BackendErrorCode};
use crate::types::FieldId;
use crate::upload::BoundaryFile;
use reqwest::{header, Client, Response};
use serde_json::Value;

/// A thin wrapper around a reqwest [`Client`] for farm-backend requests.
#[derive(Clone)]
pub struct FarmHttpClient {
    client: Client,
    base_url: String,
}

impl FarmHttpClient {
    /// Creates a new HTTP client for the configured backend.
    pub fn new(config: &EngineConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(config)?)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn create_headers(config: &EngineConfig) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let auth_header = format!("Bearer {}", token);
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&auth_header).map_err(|e| {
                    AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
                })?,
            );
        }
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    /// Makes a GET request and decodes the body as JSON.
    async fn get_json(&self, endpoint: &str) -> Result<Value, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        decode_json_response(response).await
    }

    /// Makes a PATCH request with a JSON body.
    async fn patch_json(&self, endpoint: &str, body: &Value) -> Result<Value, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("PATCH {}", url);
        let response = self.client.patch(url).json(body).send().await?;
        decode_json_response(response).await
    }
}

/// Decodes a response body as JSON, mapping non-success statuses to the
/// typed error vocabulary. Error bodies of the shape `{code, message}` or
/// `{error: {code, message}}` are honored; anything else falls back to the
/// HTTP status.
async fn decode_json_response(response: Response) -> Result<Value, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| {
            log::error!("Failed to parse response from {}: {}", url, e);
            AppError::MalformedResponse(format!("{} (from {})", e, url))
        });
    }

    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    let error_node = body.get("error").unwrap_or(&body);
    let code = error_node
        .get("code")
        .and_then(Value::as_str)
        .map(BackendErrorCode::from_api_response)
        .unwrap_or_else(|| BackendErrorCode::from_http_status(status.as_u16()));
    let message = error_node
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {} from {}", status, url));

    Err(AppError::BackendService { code, message })
}

#[async_trait::async_trait]
impl FarmBackend for FarmHttpClient {
    async fn fetch_farm_page(&self, page: u32, page_size: u32) -> Result<Value, AppError> {
        self.get_json(&format!("farms?page={}&pageSize={}", page, page_size))
            .await
    }

    async fn fetch_all_farms(&self) -> Result<Value, AppError> {
        self.get_json("farms/all").await
    }

    async fn fetch_farm(&self, id: &FieldId) -> Result<Value, AppError> {
        self.get_json(&format!("farms/{}", id)).await
    }

    async fn fetch_assigned_farmers(&self) -> Result<Value, AppError> {
        self.get_json("farmers/assigned").await
    }

    async fn upload_boundary(
        &self,
        id: &FieldId,
        file: &BoundaryFile,
        display_name: Option<&str>,
    ) -> Result<Value, AppError> {
        let url = format!("{}/farms/{}/boundary", self.base_url, id);
        log::debug!(
            "POST {} ({} bytes as '{}')",
            url,
            file.size(),
            file.file_name()
        );

        let part = reqwest::multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.file_name().to_string());
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(name) = display_name {
            form = form.text("name", name.to_string());
        }

        let response = self.client.post(url).multipart(form).send().await?;
        decode_json_response(response).await
    }

    async fn update_farm_status(&self, id: &FieldId, status: &str) -> Result<Value, AppError> {
        self.patch_json(
            &format!("farms/{}", id),
            &serde_json::json!({ "status": status }),
        )
        .await
    }
}
