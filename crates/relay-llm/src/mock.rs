use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;

use relay_core::errors::GatewayError;
use relay_core::parts::ResponsePart;
use relay_core::provider::{GenerationProvider, GenerationRequest, TextStream};

/// Pre-programmed result of one `generate` call.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Parts(Vec<ResponsePart>),
    Error(GatewayError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self::Parts(vec![ResponsePart::text(text)])
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Pre-programmed result of one `stream_text` call.
#[derive(Clone, Debug)]
pub enum MockStream {
    Chunks(Vec<String>),
    /// Yield the chunks, then fail mid-stream.
    ChunksThenError(Vec<String>, GatewayError),
    /// Yield each chunk after sleeping for the interval.
    Paced(Vec<String>, Duration),
    /// Fail when opening the stream.
    Error(GatewayError),
}

impl MockStream {
    pub fn chunks(chunks: &[&str]) -> Self {
        Self::Chunks(chunks.iter().map(|c| c.to_string()).collect())
    }
}

/// Provider that replays scripted responses in order.
///
/// `generate` and `stream_text` consume separate scripts. Every request is
/// recorded so tests can assert on what was sent upstream.
pub struct MockProvider {
    responses: Vec<MockResponse>,
    streams: Vec<MockStream>,
    generate_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
    stream_prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self::with_streams(responses, Vec::new())
    }

    pub fn with_streams(responses: Vec<MockResponse>, streams: Vec<MockStream>) -> Self {
        Self {
            responses,
            streams,
            generate_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            stream_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.generate_calls.load(Ordering::Relaxed)
    }

    pub fn stream_count(&self) -> usize {
        self.stream_calls.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    pub fn stream_prompts(&self) -> Vec<String> {
        self.stream_prompts.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<ResponsePart>, GatewayError> {
        self.requests.lock().push(request.clone());
        let idx = self.generate_calls.fetch_add(1, Ordering::Relaxed);
        let Some(response) = self.responses.get(idx) else {
            return Err(GatewayError::InvalidRequest(format!(
                "MockProvider: no response configured for call {idx}"
            )));
        };

        let mut current = response;
        loop {
            match current {
                MockResponse::Parts(parts) => return Ok(parts.clone()),
                MockResponse::Error(e) => return Err(e.clone()),
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(*duration).await;
                    current = inner;
                }
            }
        }
    }

    async fn stream_text(&self, prompt: &str) -> Result<TextStream, GatewayError> {
        self.stream_prompts.lock().push(prompt.to_string());
        let idx = self.stream_calls.fetch_add(1, Ordering::Relaxed);
        let Some(script) = self.streams.get(idx) else {
            return Err(GatewayError::InvalidRequest(format!(
                "MockProvider: no stream configured for call {idx}"
            )));
        };

        match script.clone() {
            MockStream::Chunks(chunks) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(Ok::<_, GatewayError>),
            ))),
            MockStream::ChunksThenError(chunks, err) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(Ok).chain(std::iter::once(Err(err))),
            ))),
            MockStream::Paced(chunks, interval) => Ok(Box::pin(stream::iter(chunks).then(
                move |chunk| async move {
                    tokio::time::sleep(interval).await;
                    Ok::<_, GatewayError>(chunk)
                },
            ))),
            MockStream::Error(err) => Err(err),
        }
    }
}
