use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use unicloud_core::{ApiError, ChatRequest, ChatResponse, TerraformRequest};

use crate::connectivity::{HealthProbe, ProbeResponse};
use crate::error::ClientError;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Archive returned by the export endpoint. Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerraformArchive {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Anything that can answer chat turns and produce Terraform exports.
#[async_trait]
pub trait DesignBackend: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError>;

    async fn generate_terraform(
        &self,
        request: &TerraformRequest,
    ) -> Result<TerraformArchive, ClientError>;
}

#[async_trait]
impl<B: DesignBackend + ?Sized> DesignBackend for Box<B> {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        (**self).send_chat(request).await
    }

    async fn generate_terraform(
        &self,
        request: &TerraformRequest,
    ) -> Result<TerraformArchive, ClientError> {
        (**self).generate_terraform(request).await
    }
}

/// The real design service over HTTP.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, ClientError> {
        let url = self.endpoint(path);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .header(CACHE_CONTROL, "no-store")
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }
}

/// Map a non-2xx reply to an error. 400 carries `{error}` in its body.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::BAD_REQUEST {
        let body: ApiError = decode_json(&response.bytes().await?)?;
        return Err(ClientError::BadRequest(body.error));
    }
    Err(ClientError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
    })
}

/// Decode a response body, keeping JSON errors apart from transport errors.
pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(body)?)
}

/// Compare only the media type, ignoring parameters like `charset`.
pub(crate) fn is_zip(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(ZIP_CONTENT_TYPE))
        .unwrap_or(false)
}

#[async_trait]
impl DesignBackend for HttpBackend {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let response = self.post_json("/chat", request).await.inspect_err(|e| {
            error!(error = %e, "chat request failed");
        })?;
        decode_json(&response.bytes().await?)
    }

    async fn generate_terraform(
        &self,
        request: &TerraformRequest,
    ) -> Result<TerraformArchive, ClientError> {
        let response = self
            .post_json("/terraform", request)
            .await
            .inspect_err(|e| error!(error = %e, "terraform request failed"))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_zip(&content_type) {
            return Err(ClientError::UnexpectedContentType(content_type));
        }

        let bytes = response.bytes().await?.to_vec();
        Ok(TerraformArchive {
            content_type,
            bytes,
        })
    }
}

#[async_trait]
impl HealthProbe for HttpBackend {
    async fn probe(&self) -> Result<ProbeResponse, ClientError> {
        let response = self
            .client
            .get(self.endpoint("/health"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status();
        Ok(ProbeResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }
}
