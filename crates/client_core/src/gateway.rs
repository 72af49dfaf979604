//! Remote book service access.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use shared::{
    domain::{Book, BookId, Category},
    error::ApiError,
    protocol::{UploadBuffer, FORM_DATA_PART},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

const BOOK_ENDPOINT: &str = "api/book";
const CATEGORY_ENDPOINT: &str = "api/book/GetCategoriesList";

/// Acknowledgement of a stored create or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub status: u16,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid service url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service responded with status {status}: {error}")]
    Status { status: u16, error: ApiError },
}

#[async_trait]
pub trait EntityGateway: Send + Sync {
    async fn fetch_by_id(&self, id: BookId) -> Result<Book>;
    async fn create(&self, upload: UploadBuffer) -> Result<Ack>;
    async fn update(&self, upload: UploadBuffer) -> Result<Ack>;
}

#[async_trait]
pub trait CategoryGateway: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;
}

/// HTTP client for the storefront book API.
#[derive(Debug, Clone)]
pub struct HttpBookGateway {
    http: Client,
    base_url: Url,
}

impl HttpBookGateway {
    pub fn new(base_url: &str) -> std::result::Result<Self, GatewayError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> std::result::Result<Self, GatewayError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, GatewayError> {
        Ok(self.base_url.join(path)?)
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ApiError>(&body)
            .unwrap_or_else(|_| ApiError::from_status(status.as_u16(), body));
        Err(GatewayError::Status {
            status: status.as_u16(),
            error,
        })
    }

    async fn send_upload(
        &self,
        request: RequestBuilder,
        upload: UploadBuffer,
    ) -> std::result::Result<Ack, GatewayError> {
        let parts = upload.part_names().len();
        let form = multipart_form(upload)?;
        let response = self.send(request.multipart(form)).await?;
        debug!(parts, status = response.status().as_u16(), "book upload accepted");
        Ok(Ack {
            status: response.status().as_u16(),
        })
    }
}

fn multipart_form(upload: UploadBuffer) -> std::result::Result<Form, GatewayError> {
    let (files, form_data) = upload.into_parts();
    let mut form = Form::new();
    for file in files {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)?;
        form = form.part(file.name, part);
    }
    Ok(form.text(FORM_DATA_PART, form_data))
}

#[async_trait]
impl EntityGateway for HttpBookGateway {
    async fn fetch_by_id(&self, id: BookId) -> Result<Book> {
        let url = self.endpoint(&format!("{BOOK_ENDPOINT}/{}", id.0))?;
        let book = self.send(self.http.get(url)).await?.json().await?;
        Ok(book)
    }

    async fn create(&self, upload: UploadBuffer) -> Result<Ack> {
        let url = self.endpoint(BOOK_ENDPOINT)?;
        Ok(self.send_upload(self.http.post(url), upload).await?)
    }

    async fn update(&self, upload: UploadBuffer) -> Result<Ack> {
        let url = self.endpoint(BOOK_ENDPOINT)?;
        Ok(self.send_upload(self.http.put(url), upload).await?)
    }
}

#[async_trait]
impl CategoryGateway for HttpBookGateway {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let url = self.endpoint(CATEGORY_ENDPOINT)?;
        let categories = self.send(self.http.get(url)).await?.json().await?;
        Ok(categories)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
