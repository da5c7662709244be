//! In-memory encoding API for tests
//!
//! Records every call, hands out sequential ids and rejects requests that
//! reference ids it never issued. Status polls are answered from a scripted
//! queue; once it runs dry every poll reports RUNNING. A stalled fake never
//! answers status polls at all.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::client::{ApiError, EncodingApi};
use crate::model::{
    AudioMixInputStreamRequest, CodecConfigId, CodecConfiguration, CodecKind, CodecSpec,
    Encoding, EncodingId, EncodingRequest, HttpInput, HttpInputRequest, IngestInputStreamRequest,
    InputId, InputStream, InputStreamId, Muxing, MuxingId, MuxingKind, MuxingRequest, OutputId,
    S3Output, S3OutputRequest, StartEncodingRequest, Status, Stream, StreamId, StreamRequest, Task,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateEncoding(EncodingRequest),
    CreateHttpInput(HttpInputRequest),
    CreateS3Output(S3OutputRequest),
    CreateCodecConfiguration(CodecSpec),
    CreateIngestInputStream {
        encoding_id: EncodingId,
        request: IngestInputStreamRequest,
    },
    CreateAudioMixInputStream {
        encoding_id: EncodingId,
        request: AudioMixInputStreamRequest,
    },
    CreateStream {
        encoding_id: EncodingId,
        request: StreamRequest,
    },
    CreateMuxing {
        encoding_id: EncodingId,
        kind: MuxingKind,
        request: MuxingRequest,
    },
    StartEncoding(EncodingId),
    EncodingStatus(EncodingId),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    next_id: u32,
    issued: HashSet<String>,
    statuses: VecDeque<Result<Task, ApiError>>,
    codec_failures: HashMap<CodecKind, ApiError>,
    start_failure: Option<ApiError>,
    stall_status: bool,
}

impl State {
    fn issue(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        let id = format!("{}-{}", prefix, self.next_id);
        self.issued.insert(id.clone());
        id
    }

    fn require(&self, id: &str) -> Result<(), ApiError> {
        if self.issued.contains(id) {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                status: 404,
                message: format!("unknown resource {}", id),
            })
        }
    }
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answers of the next status polls
    pub fn script_statuses<I: IntoIterator<Item = Task>>(&self, tasks: I) {
        let mut state = self.state.lock().unwrap();
        state.statuses.extend(tasks.into_iter().map(Ok));
    }

    pub fn fail_next_status(&self, error: ApiError) {
        self.state.lock().unwrap().statuses.push_back(Err(error));
    }

    pub fn reject_codec(&self, kind: CodecKind, error: ApiError) {
        self.state.lock().unwrap().codec_failures.insert(kind, error);
    }

    pub fn reject_start(&self, error: ApiError) {
        self.state.lock().unwrap().start_failure = Some(error);
    }

    /// Leave every following status poll unanswered
    pub fn stall_status(&self) {
        self.state.lock().unwrap().stall_status = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn was_issued(&self, id: &str) -> bool {
        self.state.lock().unwrap().issued.contains(id)
    }

    pub fn status_fetches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::EncodingStatus(_)))
            .count()
    }
}

#[async_trait::async_trait]
impl EncodingApi for FakeApi {
    async fn create_encoding(&self, request: &EncodingRequest) -> Result<Encoding, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateEncoding(request.clone()));
        Ok(Encoding {
            id: EncodingId::new(state.issue("enc")),
            name: request.name.clone(),
            description: request.description.clone(),
        })
    }

    async fn create_http_input(&self, request: &HttpInputRequest) -> Result<HttpInput, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateHttpInput(request.clone()));
        Ok(HttpInput {
            id: InputId::new(state.issue("in")),
            host: request.host.clone(),
        })
    }

    async fn create_s3_output(&self, request: &S3OutputRequest) -> Result<S3Output, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateS3Output(request.clone()));
        Ok(S3Output {
            id: OutputId::new(state.issue("out")),
            bucket_name: request.bucket_name.clone(),
        })
    }

    async fn create_codec_configuration(
        &self,
        spec: &CodecSpec,
    ) -> Result<CodecConfiguration, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateCodecConfiguration(spec.clone()));
        if let Some(err) = state.codec_failures.get(&spec.kind()) {
            return Err(err.clone());
        }
        Ok(CodecConfiguration {
            id: CodecConfigId::new(state.issue("codec")),
            kind: spec.kind(),
            name: spec.name().to_string(),
        })
    }

    async fn create_ingest_input_stream(
        &self,
        encoding_id: &EncodingId,
        request: &IngestInputStreamRequest,
    ) -> Result<InputStream, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateIngestInputStream {
            encoding_id: encoding_id.clone(),
            request: request.clone(),
        });
        state.require(encoding_id.as_str())?;
        state.require(request.input_id.as_str())?;
        Ok(InputStream {
            id: InputStreamId::new(state.issue("is")),
        })
    }

    async fn create_audio_mix_input_stream(
        &self,
        encoding_id: &EncodingId,
        request: &AudioMixInputStreamRequest,
    ) -> Result<InputStream, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateAudioMixInputStream {
            encoding_id: encoding_id.clone(),
            request: request.clone(),
        });
        state.require(encoding_id.as_str())?;
        for channel in &request.audio_mix_channels {
            state.require(channel.input_stream_id.as_str())?;
        }
        Ok(InputStream {
            id: InputStreamId::new(state.issue("mix")),
        })
    }

    async fn create_stream(
        &self,
        encoding_id: &EncodingId,
        request: &StreamRequest,
    ) -> Result<Stream, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateStream {
            encoding_id: encoding_id.clone(),
            request: request.clone(),
        });
        state.require(encoding_id.as_str())?;
        state.require(request.codec_config_id.as_str())?;
        for input in &request.input_streams {
            if let Some(id) = &input.input_id {
                state.require(id.as_str())?;
            }
            if let Some(id) = &input.input_stream_id {
                state.require(id.as_str())?;
            }
        }
        Ok(Stream {
            id: StreamId::new(state.issue("stream")),
            codec_config_id: request.codec_config_id.clone(),
        })
    }

    async fn create_muxing(
        &self,
        encoding_id: &EncodingId,
        kind: MuxingKind,
        request: &MuxingRequest,
    ) -> Result<Muxing, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateMuxing {
            encoding_id: encoding_id.clone(),
            kind,
            request: request.clone(),
        });
        state.require(encoding_id.as_str())?;
        for output in &request.outputs {
            state.require(output.output_id.as_str())?;
        }
        for stream in &request.streams {
            state.require(stream.stream_id.as_str())?;
        }
        Ok(Muxing {
            id: MuxingId::new(state.issue("mux")),
            kind,
            filename: request.filename.clone(),
        })
    }

    async fn start_encoding(
        &self,
        encoding_id: &EncodingId,
        _request: &StartEncodingRequest,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::StartEncoding(encoding_id.clone()));
        state.require(encoding_id.as_str())?;
        match state.start_failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn encoding_status(&self, encoding_id: &EncodingId) -> Result<Task, ApiError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::EncodingStatus(encoding_id.clone()));
            state.require(encoding_id.as_str())?;
            if !state.stall_status {
                return state
                    .statuses
                    .pop_front()
                    .unwrap_or_else(|| Ok(Task::new(Status::Running, 0)));
            }
        }
        std::future::pending().await
    }
}
