use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::errors::GatewayError;
use crate::parts::ResponsePart;
use crate::tools::ToolDescriptor;

/// Incremental text chunks from a streaming generation call.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GatewayError>> + Send>>;

/// A single tool-enabled generation request.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub tools: Vec<ToolDescriptor>,
}

/// Upstream generation service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    /// Issue one generation call and return the ordered response parts.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<ResponsePart>, GatewayError>;

    /// Open a streaming text-only generation for `prompt`.
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, GatewayError>;
}
