//! Remote resource client interface
//!
//! The orchestration only depends on this trait: creation calls return a stable
//! server id, the status call can be repeated cheaply, and every failure arrives
//! as an [`ApiError`].

use crate::model::{
    AudioMixInputStreamRequest, CodecConfiguration, CodecSpec, Encoding, EncodingId,
    EncodingRequest, HttpInput, HttpInputRequest, IngestInputStreamRequest, InputStream, Muxing,
    MuxingKind, MuxingRequest, S3Output, S3OutputRequest, StartEncodingRequest, Stream,
    StreamRequest, Task,
};
use thiserror::Error;

/// Failure of a call to the encoding API
///
/// Covers transport faults, rejected requests (authentication, validation,
/// server errors) and responses that could not be decoded. None of them are
/// retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never got an HTTP response: connect failure, timeout or
    /// broken connection
    #[error("Request to encoding API failed: {0}")]
    Transport(String),

    /// Non-success HTTP status, with the service's own message when it sent one
    #[error("Encoding API rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// A request body could not be serialized or a success body could not be
    /// parsed
    #[error("Unexpected response from encoding API: {0}")]
    Decode(String),
}

/// Request/response operations of the encoding service
#[async_trait::async_trait]
pub trait EncodingApi: Send + Sync {
    async fn create_encoding(&self, request: &EncodingRequest) -> Result<Encoding, ApiError>;

    async fn create_http_input(&self, request: &HttpInputRequest) -> Result<HttpInput, ApiError>;

    async fn create_s3_output(&self, request: &S3OutputRequest) -> Result<S3Output, ApiError>;

    async fn create_codec_configuration(
        &self,
        spec: &CodecSpec,
    ) -> Result<CodecConfiguration, ApiError>;

    async fn create_ingest_input_stream(
        &self,
        encoding_id: &EncodingId,
        request: &IngestInputStreamRequest,
    ) -> Result<InputStream, ApiError>;

    async fn create_audio_mix_input_stream(
        &self,
        encoding_id: &EncodingId,
        request: &AudioMixInputStreamRequest,
    ) -> Result<InputStream, ApiError>;

    /// Register a stream on the encoding
    async fn create_stream(
        &self,
        encoding_id: &EncodingId,
        request: &StreamRequest,
    ) -> Result<Stream, ApiError>;

    async fn create_muxing(
        &self,
        encoding_id: &EncodingId,
        kind: MuxingKind,
        request: &MuxingRequest,
    ) -> Result<Muxing, ApiError>;

    /// Start the encoding; starting the same encoding twice is rejected by the service
    async fn start_encoding(
        &self,
        encoding_id: &EncodingId,
        request: &StartEncodingRequest,
    ) -> Result<(), ApiError>;

    /// Current status of the encoding
    async fn encoding_status(&self, encoding_id: &EncodingId) -> Result<Task, ApiError>;
}
