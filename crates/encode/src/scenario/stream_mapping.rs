//! Stream mapping of mono input tracks
//!
//! The input file carries one mono audio track per channel. Tracks 0-1 are mixed
//! into a stereo track and tracks 2-7 into a 5.1 surround track; both are muxed
//! with the video into a single MP4.

use std::sync::Arc;

use chrono::Local;
use tracing::info;

use super::{PlanError, SubmittedPlan};
use crate::client::EncodingApi;
use crate::config::Config;
use crate::model::{
    AudioCodecParams, AudioMixChannelType, AudioMixInputChannelLayout, ChannelLayout, CodecSpec,
    MuxingKind, PresetConfiguration, VideoCodecParams,
};
use crate::plan::{timestamped_namespace, ChannelMapping, OutputPaths, PlanBuilder, TrackSelection};

pub const NAMESPACE_PREFIX: &str = "StreamMappingMonoInputTracks";

pub const OUTPUT_FILE_NAME: &str = "stereo-and-surround-tracks-mapped.mp4";

pub const STEREO_MAPPING: [ChannelMapping; 2] = [
    ChannelMapping::new(AudioMixChannelType::FrontLeft, 0),
    ChannelMapping::new(AudioMixChannelType::FrontRight, 1),
];

pub const SURROUND_MAPPING: [ChannelMapping; 6] = [
    ChannelMapping::new(AudioMixChannelType::FrontLeft, 2),
    ChannelMapping::new(AudioMixChannelType::FrontRight, 3),
    ChannelMapping::new(AudioMixChannelType::BackLeft, 4),
    ChannelMapping::new(AudioMixChannelType::BackRight, 5),
    ChannelMapping::new(AudioMixChannelType::Center, 6),
    ChannelMapping::new(AudioMixChannelType::LowFrequency, 7),
];

#[derive(Debug, Clone, PartialEq)]
pub struct StreamMappingPlan {
    pub name: String,
    pub description: String,
    pub video: CodecSpec,
    pub stereo: CodecSpec,
    pub surround: CodecSpec,
}

impl Default for StreamMappingPlan {
    fn default() -> Self {
        Self {
            name: "Audio Mapping - Stream Mapping - Multiple Mono Tracks".to_string(),
            description: "Input with multiple mono tracks -> Output with stereo and surround tracks"
                .to_string(),
            video: CodecSpec::H264(VideoCodecParams {
                name: "H.264 1080p @ 1.5 Mbit/s".to_string(),
                height: Some(1080),
                bitrate: 1_500_000,
                preset: Some(PresetConfiguration::VodStandard),
            }),
            stereo: CodecSpec::Aac(AudioCodecParams {
                name: "AAC Audio @ 128 kbit/s".to_string(),
                bitrate: 128_000,
                channel_layout: None,
            }),
            surround: CodecSpec::DolbyDigital(AudioCodecParams {
                name: "Dolby Digital Channel Layout 5.1".to_string(),
                bitrate: 256_000,
                channel_layout: Some(ChannelLayout::Surround51),
            }),
        }
    }
}

impl StreamMappingPlan {
    pub async fn submit(
        &self,
        config: &Config,
        client: Arc<dyn EncodingApi>,
    ) -> Result<SubmittedPlan, PlanError> {
        let host = config.http_input_host()?;
        let input_path = config.http_input_file_path_with_multiple_mono_audio_tracks()?;
        let bucket = config.s3_output_bucket_name()?;
        let access_key = config.s3_output_access_key()?;
        let secret_key = config.s3_output_secret_key()?;
        let base_path = config.s3_output_base_path()?;

        let namespace = timestamped_namespace(NAMESPACE_PREFIX, Local::now().naive_local());
        let plan = PlanBuilder::new(client, OutputPaths::new(base_path, namespace));

        let encoding = plan.create_encoding(&self.name, &self.description).await?;

        let (input, output) = tokio::try_join!(
            plan.create_http_input(host),
            plan.create_s3_output(bucket, access_key, secret_key),
        )?;

        let (video_config, stereo_config, surround_config) = tokio::try_join!(
            plan.create_codec_config(&self.video),
            plan.create_codec_config(&self.stereo),
            plan.create_codec_config(&self.surround),
        )?;

        let video_input = plan
            .create_ingest_input_stream(&encoding, &input, input_path, TrackSelection::Auto)
            .await?;
        let stereo_input = plan
            .create_audio_mix_input_stream(
                &encoding,
                &input,
                input_path,
                AudioMixInputChannelLayout::Stereo,
                &STEREO_MAPPING,
            )
            .await?;
        let surround_input = plan
            .create_audio_mix_input_stream(
                &encoding,
                &input,
                input_path,
                AudioMixInputChannelLayout::Surround51Back,
                &SURROUND_MAPPING,
            )
            .await?;

        let video_inputs = [&video_input];
        let stereo_inputs = [&stereo_input];
        let surround_inputs = [&surround_input];
        let (video_stream, stereo_stream, surround_stream) = tokio::try_join!(
            plan.create_stream_from_input_streams(&encoding, &video_inputs, &video_config),
            plan.create_stream_from_input_streams(&encoding, &stereo_inputs, &stereo_config),
            plan.create_stream_from_input_streams(&encoding, &surround_inputs, &surround_config),
        )?;

        let muxing = plan
            .create_muxing(
                MuxingKind::Mp4,
                &encoding,
                &output,
                "/",
                &[&video_stream, &stereo_stream, &surround_stream],
                OUTPUT_FILE_NAME,
            )
            .await?;

        let namespace = plan.paths().namespace().to_string();
        info!(encoding = %encoding.id, namespace = %namespace, "stream mapping plan created");
        Ok(SubmittedPlan {
            encoding,
            namespace,
            streams: vec![video_stream, stereo_stream, surround_stream],
            muxings: vec![muxing],
        })
    }
}
