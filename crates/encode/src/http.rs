//! Bitmovin Encoding API client over HTTP/JSON.
//!
//! Responses wrap the created resource in `{"data": {"result": ...}}`; rejected
//! requests carry `{"data": {"message": ..., "developerMessage": ...}}`.

use std::time::Duration;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{ApiError, EncodingApi};
use crate::config::{Config, ConfigError};
use crate::model::{
    AudioMixInputStreamRequest, CodecConfigId, CodecConfiguration, CodecSpec, Encoding,
    EncodingId, EncodingRequest, HttpInput, HttpInputRequest, IngestInputStreamRequest,
    InputStream, InputStreamId, Muxing, MuxingId, MuxingKind, MuxingRequest, S3Output,
    S3OutputRequest, StartEncodingRequest, Stream, StreamId, StreamRequest, Task,
};

pub use crate::config::DEFAULT_API_BASE_URL;

const API_KEY_HEADER: &str = "X-Api-Key";
const TENANT_ORG_ID_HEADER: &str = "X-Tenant-Org-Id";
const CLIENT_HEADER: &str = "X-Api-Client";
const CLIENT_NAME: &str = "cloud-encode";

/// Upper bound on a single request, connect to last body byte
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct Envelope<T> {
    data: ResultData<T>,
}

#[derive(Deserialize)]
struct ResultData<T> {
    result: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    data: ErrorData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorData {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    developer_message: Option<String>,
}

/// Minimal view of a freshly created resource
#[derive(Deserialize)]
struct Created {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

pub struct BitmovinClient {
    base_url: String,
    api_key: String,
    tenant_org_id: Option<String>,
    request_timeout: Duration,
    client: reqwest::Client,
}

impl BitmovinClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: api_key.into(),
            tenant_org_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Client for the API key, tenant and endpoint of the given configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.api_key()?)
            .with_base_url(config.api_base_url())
            .with_tenant_org_id(config.tenant_org_id().map(str::to_string)))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_tenant_org_id(mut self, tenant_org_id: Option<String>) -> Self {
        self.tenant_org_id = tenant_org_id;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "encoding API request");

        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.request_timeout)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CLIENT_HEADER, CLIENT_NAME);
        if let Some(tenant) = &self.tenant_org_id {
            builder = builder.header(TENANT_ORG_ID_HEADER, tenant);
        }
        builder
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(self.request(reqwest::Method::POST, path).json(body))
            .await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.send(self.request(reqwest::Method::GET, path)).await
    }

    async fn send<R: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<R, ApiError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.text().await {
                Ok(body) => rejection_message(status, &body),
                Err(e) => format!(
                    "{} (response body unreadable: {e})",
                    status.canonical_reason().unwrap_or("request rejected")
                ),
            };
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<R> = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("parse JSON: {e}")))?;
        Ok(envelope.data.result)
    }
}

fn rejection_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let ErrorData {
            message,
            developer_message,
        } = envelope.data;
        match (message, developer_message) {
            (Some(m), Some(d)) if m != d => return format!("{m} ({d})"),
            (Some(m), _) | (None, Some(m)) => return m,
            (None, None) => {}
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.trim().to_string()
    }
}

#[async_trait::async_trait]
impl EncodingApi for BitmovinClient {
    async fn create_encoding(&self, request: &EncodingRequest) -> Result<Encoding, ApiError> {
        self.post("/encoding/encodings", request).await
    }

    async fn create_http_input(&self, request: &HttpInputRequest) -> Result<HttpInput, ApiError> {
        self.post("/encoding/inputs/http", request).await
    }

    async fn create_s3_output(&self, request: &S3OutputRequest) -> Result<S3Output, ApiError> {
        self.post("/encoding/outputs/s3", request).await
    }

    async fn create_codec_configuration(
        &self,
        spec: &CodecSpec,
    ) -> Result<CodecConfiguration, ApiError> {
        let body = spec
            .to_body()
            .map_err(|e| ApiError::Decode(format!("serialize codec configuration: {e}")))?;
        let path = format!("/encoding/configurations/{}", spec.kind().endpoint());
        let created: Created = self.post(&path, &body).await?;

        Ok(CodecConfiguration {
            id: CodecConfigId::new(created.id),
            kind: spec.kind(),
            name: created.name.unwrap_or_else(|| spec.name().to_string()),
        })
    }

    async fn create_ingest_input_stream(
        &self,
        encoding_id: &EncodingId,
        request: &IngestInputStreamRequest,
    ) -> Result<InputStream, ApiError> {
        let path = format!("/encoding/encodings/{encoding_id}/input-streams/ingest");
        let created: Created = self.post(&path, request).await?;
        Ok(InputStream {
            id: InputStreamId::new(created.id),
        })
    }

    async fn create_audio_mix_input_stream(
        &self,
        encoding_id: &EncodingId,
        request: &AudioMixInputStreamRequest,
    ) -> Result<InputStream, ApiError> {
        let path = format!("/encoding/encodings/{encoding_id}/input-streams/audio-mix");
        let created: Created = self.post(&path, request).await?;
        Ok(InputStream {
            id: InputStreamId::new(created.id),
        })
    }

    async fn create_stream(
        &self,
        encoding_id: &EncodingId,
        request: &StreamRequest,
    ) -> Result<Stream, ApiError> {
        let path = format!("/encoding/encodings/{encoding_id}/streams");
        let created: Created = self.post(&path, request).await?;
        Ok(Stream {
            id: StreamId::new(created.id),
            codec_config_id: request.codec_config_id.clone(),
        })
    }

    async fn create_muxing(
        &self,
        encoding_id: &EncodingId,
        kind: MuxingKind,
        request: &MuxingRequest,
    ) -> Result<Muxing, ApiError> {
        let path = format!(
            "/encoding/encodings/{encoding_id}/muxings/{}",
            kind.endpoint()
        );
        let created: Created = self.post(&path, request).await?;
        Ok(Muxing {
            id: MuxingId::new(created.id),
            kind,
            filename: request.filename.clone(),
        })
    }

    async fn start_encoding(
        &self,
        encoding_id: &EncodingId,
        request: &StartEncodingRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/encoding/encodings/{encoding_id}/start");
        let _: IgnoredAny = self.post(&path, request).await?;
        Ok(())
    }

    async fn encoding_status(&self, encoding_id: &EncodingId) -> Result<Task, ApiError> {
        self.get(&format!("/encoding/encodings/{encoding_id}/status"))
            .await
    }
}
