//! Encoding scenarios
//!
//! Each scenario reads the values it needs from the configuration, then builds
//! its resource graph through [`PlanBuilder`](crate::plan::PlanBuilder). Nothing
//! is started here; the returned [`SubmittedPlan`] is handed to the job runner.

pub mod multi_codec;
pub mod stream_mapping;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::client::{ApiError, EncodingApi};
use crate::config::{Config, ConfigError};
use crate::model::{Encoding, Muxing, Stream};

pub use multi_codec::MultiCodecPlan;
pub use stream_mapping::StreamMappingPlan;

/// Error type for building a plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Resources created for one encoding, ready to be started
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedPlan {
    pub encoding: Encoding,
    pub namespace: String,
    pub streams: Vec<Stream>,
    pub muxings: Vec<Muxing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// H.264/AAC and H.265/AC3 renditions in MP4 and progressive TS
    MultiCodec,
    /// Mono audio tracks mixed into stereo and 5.1 surround tracks
    StreamMappingMonoTracks,
}

impl Scenario {
    pub async fn submit(
        &self,
        config: &Config,
        client: Arc<dyn EncodingApi>,
    ) -> Result<SubmittedPlan, PlanError> {
        match self {
            Scenario::MultiCodec => MultiCodecPlan::default().submit(config, client).await,
            Scenario::StreamMappingMonoTracks => {
                StreamMappingPlan::default().submit(config, client).await
            }
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::MultiCodec => write!(f, "multi-codec"),
            Scenario::StreamMappingMonoTracks => write!(f, "stream-mapping"),
        }
    }
}
