//! Resource model of the encoding API
//!
//! Request types are serialized into creation calls; resource types are what the
//! API hands back and only carry what later calls need (mostly the server id).
//! Ids are wrapped in one newtype per resource kind so a stream id can never be
//! passed where a codec configuration id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

resource_id!(
    /// Server id of an encoding
    EncodingId
);
resource_id!(
    /// Server id of an input (HTTP server)
    InputId
);
resource_id!(
    /// Server id of an output (S3 bucket)
    OutputId
);
resource_id!(CodecConfigId);
resource_id!(InputStreamId);
resource_id!(StreamId);
resource_id!(MuxingId);

// ============================================================================
// Encoding, input, output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Top-level job container grouping streams and muxings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub id: EncodingId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpInputRequest {
    pub host: String,
}

/// HTTP server providing the input files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpInput {
    pub id: InputId,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3OutputRequest {
    pub bucket_name: String,
    pub access_key: String,
    pub secret_key: String,
}

/// S3 bucket generated content is transferred to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Output {
    pub id: OutputId,
    pub bucket_name: String,
}

// ============================================================================
// Codec configurations
// ============================================================================

/// Kind of track a codec applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    H264,
    H265,
    Aac,
    Ac3,
    DolbyDigital,
}

impl CodecKind {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            CodecKind::H264 | CodecKind::H265 => MediaKind::Video,
            CodecKind::Aac | CodecKind::Ac3 | CodecKind::DolbyDigital => MediaKind::Audio,
        }
    }

    /// Path segment below `/encoding/configurations`
    pub fn endpoint(&self) -> &'static str {
        match self {
            CodecKind::H264 => "video/h264",
            CodecKind::H265 => "video/h265",
            CodecKind::Aac => "audio/aac",
            CodecKind::Ac3 => "audio/ac3",
            CodecKind::DolbyDigital => "audio/dolby-digital",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::H264 => write!(f, "H.264"),
            CodecKind::H265 => write!(f, "H.265"),
            CodecKind::Aac => write!(f, "AAC"),
            CodecKind::Ac3 => write!(f, "AC3"),
            CodecKind::DolbyDigital => write!(f, "Dolby Digital"),
        }
    }
}

/// Named set of proven codec settings applied by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresetConfiguration {
    VodStandard,
    VodHighQuality,
    VodHighSpeed,
    LiveStandard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    #[serde(rename = "CL_STEREO")]
    Stereo,
    #[serde(rename = "CL_5_1")]
    Surround51,
}

/// Video codec parameters; width is derived by the service from the input aspect ratio
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCodecParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Target bitrate in bit/s
    pub bitrate: u64,
    #[serde(rename = "presetConfiguration", skip_serializing_if = "Option::is_none")]
    pub preset: Option<PresetConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioCodecParams {
    pub name: String,
    /// Target bitrate in bit/s
    pub bitrate: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_layout: Option<ChannelLayout>,
}

/// Parameters of a codec configuration to create
///
/// Values are sent as given; range checks are left to the service.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecSpec {
    H264(VideoCodecParams),
    H265(VideoCodecParams),
    Aac(AudioCodecParams),
    Ac3(AudioCodecParams),
    DolbyDigital(AudioCodecParams),
}

impl CodecSpec {
    pub fn kind(&self) -> CodecKind {
        match self {
            CodecSpec::H264(_) => CodecKind::H264,
            CodecSpec::H265(_) => CodecKind::H265,
            CodecSpec::Aac(_) => CodecKind::Aac,
            CodecSpec::Ac3(_) => CodecKind::Ac3,
            CodecSpec::DolbyDigital(_) => CodecKind::DolbyDigital,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CodecSpec::H264(p) | CodecSpec::H265(p) => &p.name,
            CodecSpec::Aac(p) | CodecSpec::Ac3(p) | CodecSpec::DolbyDigital(p) => &p.name,
        }
    }

    pub fn bitrate(&self) -> u64 {
        match self {
            CodecSpec::H264(p) | CodecSpec::H265(p) => p.bitrate,
            CodecSpec::Aac(p) | CodecSpec::Ac3(p) | CodecSpec::DolbyDigital(p) => p.bitrate,
        }
    }

    /// JSON request body for the configuration endpoint of this codec
    pub fn to_body(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            CodecSpec::H264(p) | CodecSpec::H265(p) => serde_json::to_value(p),
            CodecSpec::Aac(p) | CodecSpec::Ac3(p) | CodecSpec::DolbyDigital(p) => {
                serde_json::to_value(p)
            }
        }
    }
}

/// A created codec configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CodecConfiguration {
    pub id: CodecConfigId,
    pub kind: CodecKind,
    pub name: String,
}

// ============================================================================
// Input streams and streams
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamSelectionMode {
    /// First track matching the media kind of the codec configuration
    Auto,
    PositionAbsolute,
    VideoRelative,
    AudioRelative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamMode {
    Standard,
}

/// Source of a stream: either a file track selected directly, or an input stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_id: Option<InputId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_mode: Option<StreamSelectionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<InputStreamId>,
}

impl StreamInput {
    pub fn from_file(input_id: InputId, input_path: &str, mode: StreamSelectionMode) -> Self {
        Self {
            input_id: Some(input_id),
            input_path: Some(input_path.to_string()),
            selection_mode: Some(mode),
            input_stream_id: None,
        }
    }

    pub fn from_input_stream(input_stream_id: InputStreamId) -> Self {
        Self {
            input_id: None,
            input_path: None,
            selection_mode: None,
            input_stream_id: Some(input_stream_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub input_streams: Vec<StreamInput>,
    pub codec_config_id: CodecConfigId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<StreamMode>,
}

/// Binding of an input track to exactly one codec configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub id: StreamId,
    pub codec_config_id: CodecConfigId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestInputStreamRequest {
    pub input_id: InputId,
    pub input_path: String,
    pub selection_mode: StreamSelectionMode,
    /// Track position, relative to the selection mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioMixChannelType {
    FrontLeft,
    FrontRight,
    Center,
    LowFrequency,
    BackLeft,
    BackRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioMixInputChannelLayout {
    #[serde(rename = "CL_STEREO")]
    Stereo,
    #[serde(rename = "CL_5_1_BACK")]
    Surround51Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioMixSourceChannelType {
    ChannelNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMixInputStreamSourceChannel {
    #[serde(rename = "type")]
    pub kind: AudioMixSourceChannelType,
    pub channel_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMixInputStreamChannel {
    pub input_stream_id: InputStreamId,
    pub output_channel_type: AudioMixChannelType,
    pub source_channels: Vec<AudioMixInputStreamSourceChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMixInputStreamRequest {
    pub channel_layout: AudioMixInputChannelLayout,
    pub audio_mix_channels: Vec<AudioMixInputStreamChannel>,
}

/// An ingest or audio-mix input stream registered on an encoding
#[derive(Debug, Clone, PartialEq)]
pub struct InputStream {
    pub id: InputStreamId,
}

// ============================================================================
// Muxings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MuxingKind {
    Mp4,
    ProgressiveTs,
}

impl MuxingKind {
    /// Path segment below `/encoding/encodings/{id}/muxings`
    pub fn endpoint(&self) -> &'static str {
        match self {
            MuxingKind::Mp4 => "mp4",
            MuxingKind::ProgressiveTs => "progressive-ts",
        }
    }
}

impl fmt::Display for MuxingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuxingKind::Mp4 => write!(f, "MP4"),
            MuxingKind::ProgressiveTs => write!(f, "progressive TS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclPermission {
    PublicRead,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AclEntry {
    pub permission: AclPermission,
}

/// Where the content of a muxing is written to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingOutput {
    pub output_id: OutputId,
    pub output_path: String,
    pub acl: Vec<AclEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuxingStream {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuxingRequest {
    pub outputs: Vec<EncodingOutput>,
    pub filename: String,
    pub streams: Vec<MuxingStream>,
}

impl MuxingRequest {
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.streams.iter().map(|s| s.stream_id.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Muxing {
    pub id: MuxingId,
    pub kind: MuxingKind,
    pub filename: String,
}

// ============================================================================
// Start and status
// ============================================================================

/// Start options; the empty request applies the service defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StartEncodingRequest {}

/// Status of an encoding as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Created,
    Queued,
    Running,
    Finished,
    Error,
    Canceled,
    Transferring,
    #[serde(other)]
    Unknown,
}

impl Status {
    /// FINISHED and ERROR end polling; every other status keeps it going
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Finished | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Created => "CREATED",
            Status::Queued => "QUEUED",
            Status::Running => "RUNNING",
            Status::Finished => "FINISHED",
            Status::Error => "ERROR",
            Status::Canceled => "CANCELED",
            Status::Transferring => "TRANSFERRING",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Message {
    pub fn new(message_type: MessageType, text: impl Into<String>) -> Self {
        Self {
            message_type,
            text: text.into(),
            date: None,
        }
    }
}

/// Polled progress of an encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub status: Status,
    /// Percentage, 0-100
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Task {
    pub fn new(status: Status, progress: u32) -> Self {
        Self {
            status,
            progress: Some(progress),
            messages: Vec::new(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Texts of all messages tagged ERROR, in reported order
    pub fn error_messages(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.message_type == MessageType::Error)
            .map(|m| m.text.clone())
            .collect()
    }
}
