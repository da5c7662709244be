//! Encoding plan builder
//!
//! Creates the resources of an encoding in dependency order. Every call that
//! depends on other resources takes the created resources themselves, so a
//! stream cannot be requested before its input and codec configuration exist,
//! and a muxing cannot be requested before its streams exist.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::info;

use crate::client::{ApiError, EncodingApi};
use crate::model::{
    AclEntry, AclPermission, AudioMixChannelType, AudioMixInputChannelLayout,
    AudioMixInputStreamChannel, AudioMixInputStreamRequest, AudioMixInputStreamSourceChannel,
    AudioMixSourceChannelType, CodecConfiguration, CodecSpec, Encoding, EncodingOutput,
    EncodingRequest, HttpInput, HttpInputRequest, IngestInputStreamRequest, InputStream, Muxing,
    MuxingKind, MuxingRequest, MuxingStream, S3Output, S3OutputRequest, Stream, StreamInput,
    StreamMode, StreamRequest, StreamSelectionMode,
};

/// Join path segments with `/`, dropping empty segments and duplicate separators.
///
/// The result is absolute when `base_path` is.
pub fn build_absolute_path(base_path: &str, namespace: &str, relative_path: &str) -> String {
    let joined = [base_path, namespace, relative_path]
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if base_path.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Namespace made unique per run by appending a local timestamp (seconds precision)
pub fn timestamped_namespace(name: &str, now: NaiveDateTime) -> String {
    format!("{}-{}", name, now.format("%Y-%m-%dT%H:%M:%S"))
}

/// Output location of one plan: `{base_path}/{namespace}/...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    base_path: String,
    namespace: String,
}

impl OutputPaths {
    pub fn new(base_path: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn absolute(&self, relative_path: &str) -> String {
        build_absolute_path(&self.base_path, &self.namespace, relative_path)
    }
}

/// How an ingest input stream picks its track from the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSelection {
    Auto,
    /// n-th audio track of the file, counting from 0
    AudioRelative(u32),
}

/// Maps one mono source track onto one channel of a mixed audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMapping {
    pub output_channel: AudioMixChannelType,
    pub source_track: u32,
}

impl ChannelMapping {
    pub const fn new(output_channel: AudioMixChannelType, source_track: u32) -> Self {
        Self {
            output_channel,
            source_track,
        }
    }
}

/// Issues the creation calls of an encoding plan against the encoding API
pub struct PlanBuilder {
    client: Arc<dyn EncodingApi>,
    paths: OutputPaths,
}

impl PlanBuilder {
    pub fn new(client: Arc<dyn EncodingApi>, paths: OutputPaths) -> Self {
        Self { client, paths }
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Creates the encoding every stream and muxing of the plan is registered on
    pub async fn create_encoding(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Encoding, ApiError> {
        let encoding = self
            .client
            .create_encoding(&EncodingRequest {
                name: name.to_string(),
                description: Some(description.to_string()),
            })
            .await?;
        info!(id = %encoding.id, name = %encoding.name, "created encoding");
        Ok(encoding)
    }

    /// Creates a resource for the HTTP server providing the input files
    ///
    /// A new input resource is created on each run; long-lived setups would look
    /// up an existing one instead.
    pub async fn create_http_input(&self, host: &str) -> Result<HttpInput, ApiError> {
        let input = self
            .client
            .create_http_input(&HttpInputRequest {
                host: host.to_string(),
            })
            .await?;
        info!(id = %input.id, host = %input.host, "created HTTP input");
        Ok(input)
    }

    /// Creates a resource for the S3 bucket generated content is written to
    ///
    /// The credentials need read, write and list permissions on the bucket, and
    /// delete to allow overwriting existing files.
    pub async fn create_s3_output(
        &self,
        bucket_name: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<S3Output, ApiError> {
        let output = self
            .client
            .create_s3_output(&S3OutputRequest {
                bucket_name: bucket_name.to_string(),
                access_key: access_key.to_string(),
                secret_key: secret_key.to_string(),
            })
            .await?;
        info!(id = %output.id, bucket = %output.bucket_name, "created S3 output");
        Ok(output)
    }

    pub async fn create_codec_config(
        &self,
        spec: &CodecSpec,
    ) -> Result<CodecConfiguration, ApiError> {
        let config = self.client.create_codec_configuration(spec).await?;
        info!(
            id = %config.id,
            codec = %config.kind,
            name = %config.name,
            bitrate = spec.bitrate(),
            "created codec configuration"
        );
        Ok(config)
    }

    /// Binds the input file to a codec configuration, letting the service pick
    /// the first track matching the codec's media kind
    pub async fn create_stream(
        &self,
        encoding: &Encoding,
        input: &HttpInput,
        input_path: &str,
        codec_config: &CodecConfiguration,
    ) -> Result<Stream, ApiError> {
        let request = StreamRequest {
            input_streams: vec![StreamInput::from_file(
                input.id.clone(),
                input_path,
                StreamSelectionMode::Auto,
            )],
            codec_config_id: codec_config.id.clone(),
            mode: None,
        };
        let stream = self.client.create_stream(&encoding.id, &request).await?;
        info!(
            id = %stream.id,
            codec = %codec_config.kind,
            media = ?codec_config.kind.media_kind(),
            "created stream"
        );
        Ok(stream)
    }

    /// Registers a file track as input stream of the encoding
    pub async fn create_ingest_input_stream(
        &self,
        encoding: &Encoding,
        input: &HttpInput,
        input_path: &str,
        selection: TrackSelection,
    ) -> Result<InputStream, ApiError> {
        let (selection_mode, position) = match selection {
            TrackSelection::Auto => (StreamSelectionMode::Auto, None),
            TrackSelection::AudioRelative(position) => {
                (StreamSelectionMode::AudioRelative, Some(position))
            }
        };
        let request = IngestInputStreamRequest {
            input_id: input.id.clone(),
            input_path: input_path.to_string(),
            selection_mode,
            position,
        };
        let input_stream = self
            .client
            .create_ingest_input_stream(&encoding.id, &request)
            .await?;
        info!(id = %input_stream.id, ?selection, "created ingest input stream");
        Ok(input_stream)
    }

    /// Mixes mono audio tracks of the input file into one multi-channel input stream
    ///
    /// Each mapping gets its own ingest input stream selecting the source track;
    /// the mix is created once all of them exist.
    pub async fn create_audio_mix_input_stream(
        &self,
        encoding: &Encoding,
        input: &HttpInput,
        input_path: &str,
        channel_layout: AudioMixInputChannelLayout,
        mappings: &[ChannelMapping],
    ) -> Result<InputStream, ApiError> {
        let mut audio_mix_channels = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let track = self
                .create_ingest_input_stream(
                    encoding,
                    input,
                    input_path,
                    TrackSelection::AudioRelative(mapping.source_track),
                )
                .await?;

            audio_mix_channels.push(AudioMixInputStreamChannel {
                input_stream_id: track.id,
                output_channel_type: mapping.output_channel,
                source_channels: vec![AudioMixInputStreamSourceChannel {
                    kind: AudioMixSourceChannelType::ChannelNumber,
                    channel_number: 0,
                }],
            });
        }

        let request = AudioMixInputStreamRequest {
            channel_layout,
            audio_mix_channels,
        };
        let mix = self
            .client
            .create_audio_mix_input_stream(&encoding.id, &request)
            .await?;
        info!(id = %mix.id, ?channel_layout, channels = mappings.len(), "created audio mix input stream");
        Ok(mix)
    }

    /// Creates a stream from existing input streams
    pub async fn create_stream_from_input_streams(
        &self,
        encoding: &Encoding,
        input_streams: &[&InputStream],
        codec_config: &CodecConfiguration,
    ) -> Result<Stream, ApiError> {
        let request = StreamRequest {
            input_streams: input_streams
                .iter()
                .map(|s| StreamInput::from_input_stream(s.id.clone()))
                .collect(),
            codec_config_id: codec_config.id.clone(),
            mode: Some(StreamMode::Standard),
        };
        let stream = self.client.create_stream(&encoding.id, &request).await?;
        info!(
            id = %stream.id,
            codec = %codec_config.kind,
            media = ?codec_config.kind.media_kind(),
            "created stream"
        );
        Ok(stream)
    }

    /// Packages streams into a container file written below the plan's output path
    pub async fn create_muxing(
        &self,
        kind: MuxingKind,
        encoding: &Encoding,
        output: &S3Output,
        output_path: &str,
        streams: &[&Stream],
        file_name: &str,
    ) -> Result<Muxing, ApiError> {
        let request = MuxingRequest {
            outputs: vec![self.build_encoding_output(output, output_path)],
            filename: file_name.to_string(),
            streams: streams
                .iter()
                .map(|s| MuxingStream {
                    stream_id: s.id.clone(),
                })
                .collect(),
        };
        let muxing = self
            .client
            .create_muxing(&encoding.id, kind, &request)
            .await?;
        info!(
            id = %muxing.id,
            kind = %kind,
            path = %request.outputs[0].output_path,
            file = %muxing.filename,
            "created muxing"
        );
        Ok(muxing)
    }

    /// Output binding with public read permission, so files can be fetched over HTTP
    pub fn build_encoding_output(&self, output: &S3Output, output_path: &str) -> EncodingOutput {
        EncodingOutput {
            output_id: output.id.clone(),
            output_path: self.paths.absolute(output_path),
            acl: vec![AclEntry {
                permission: AclPermission::PublicRead,
            }],
        }
    }
}
