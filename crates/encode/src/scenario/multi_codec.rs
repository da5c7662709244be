//! Multi-codec encoding
//!
//! One input file encoded with H.264 and H.265 video plus AAC and AC3 audio,
//! packaged as H.264/AAC MP4, H.265/AC3 MP4 and H.264/AAC progressive TS.

use std::sync::Arc;

use tracing::info;

use super::{PlanError, SubmittedPlan};
use crate::client::EncodingApi;
use crate::config::Config;
use crate::model::{
    AudioCodecParams, CodecSpec, MuxingKind, PresetConfiguration, VideoCodecParams,
};
use crate::plan::{OutputPaths, PlanBuilder};

pub const NAMESPACE: &str = "MultiCodecEncoding";

/// Names and codec settings of the multi-codec encoding
#[derive(Debug, Clone, PartialEq)]
pub struct MultiCodecPlan {
    pub name: String,
    pub description: String,
    pub h264: CodecSpec,
    pub h265: CodecSpec,
    pub aac: CodecSpec,
    pub ac3: CodecSpec,
}

impl Default for MultiCodecPlan {
    fn default() -> Self {
        Self {
            name: "Multi codec encoding".to_string(),
            description: "Encoding with H.264, H.265 and VP9".to_string(),
            h264: CodecSpec::H264(VideoCodecParams {
                name: "H.264 1080p 1.5 Mbit/s".to_string(),
                height: Some(1080),
                bitrate: 1_500_000,
                preset: Some(PresetConfiguration::VodStandard),
            }),
            h265: CodecSpec::H265(VideoCodecParams {
                name: "H.265 video config".to_string(),
                height: Some(1080),
                bitrate: 1_500_000,
                preset: Some(PresetConfiguration::VodStandard),
            }),
            aac: CodecSpec::Aac(AudioCodecParams {
                name: "AAC 128 kbit/s".to_string(),
                bitrate: 128_000,
                channel_layout: None,
            }),
            ac3: CodecSpec::Ac3(AudioCodecParams {
                name: "AC3 128 kbit/s".to_string(),
                bitrate: 128_000,
                channel_layout: None,
            }),
        }
    }
}

impl MultiCodecPlan {
    /// Create every resource of the encoding, in dependency order
    ///
    /// Configuration is read up front, so a missing value fails before any
    /// remote call is made.
    pub async fn submit(
        &self,
        config: &Config,
        client: Arc<dyn EncodingApi>,
    ) -> Result<SubmittedPlan, PlanError> {
        let host = config.http_input_host()?;
        let input_path = config.http_input_file_path()?;
        let bucket = config.s3_output_bucket_name()?;
        let access_key = config.s3_output_access_key()?;
        let secret_key = config.s3_output_secret_key()?;
        let base_path = config.s3_output_base_path()?;

        let plan = PlanBuilder::new(client, OutputPaths::new(base_path, NAMESPACE));

        let encoding = plan.create_encoding(&self.name, &self.description).await?;

        let (input, output) = tokio::try_join!(
            plan.create_http_input(host),
            plan.create_s3_output(bucket, access_key, secret_key),
        )?;

        let (h264, h265, aac, ac3) = tokio::try_join!(
            plan.create_codec_config(&self.h264),
            plan.create_codec_config(&self.h265),
            plan.create_codec_config(&self.aac),
            plan.create_codec_config(&self.ac3),
        )?;

        let (h264_stream, h265_stream, aac_stream, ac3_stream) = tokio::try_join!(
            plan.create_stream(&encoding, &input, input_path, &h264),
            plan.create_stream(&encoding, &input, input_path, &h265),
            plan.create_stream(&encoding, &input, input_path, &aac),
            plan.create_stream(&encoding, &input, input_path, &ac3),
        )?;

        let h264_aac = [&h264_stream, &aac_stream];
        let h265_ac3 = [&h265_stream, &ac3_stream];
        let (mp4_h264, mp4_h265, ts_h264) = tokio::try_join!(
            plan.create_muxing(
                MuxingKind::Mp4,
                &encoding,
                &output,
                "mp4-h264-aac",
                &h264_aac,
                "video.mp4",
            ),
            plan.create_muxing(
                MuxingKind::Mp4,
                &encoding,
                &output,
                "mp4-h265-ac3",
                &h265_ac3,
                "video.mp4",
            ),
            plan.create_muxing(
                MuxingKind::ProgressiveTs,
                &encoding,
                &output,
                "progressivets-h264-aac",
                &h264_aac,
                "video.ts",
            ),
        )?;

        let namespace = plan.paths().namespace().to_string();
        info!(encoding = %encoding.id, namespace = %namespace, "multi-codec plan created");
        Ok(SubmittedPlan {
            encoding,
            namespace,
            streams: vec![h264_stream, h265_stream, aac_stream, ac3_stream],
            muxings: vec![mp4_h264, mp4_h265, ts_h264],
        })
    }
}
