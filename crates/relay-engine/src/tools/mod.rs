pub mod draft_email;
pub mod generate_report_pdf;
pub mod generate_text_file;
pub mod inform_user;

use std::sync::Arc;

use futures::StreamExt;
use relay_core::provider::GenerationProvider;
use relay_core::tools::{ToolEmitter, ToolError};
use tracing::debug;

use crate::artifacts::ArtifactStore;
use crate::prompt::expansion_prompt;
use crate::registry::ToolRegistry;

/// Create a ToolRegistry with all built-in tools.
pub fn create_default_registry(
    provider: Arc<dyn GenerationProvider>,
    artifacts: Arc<dyn ArtifactStore>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // User interaction
    registry.register(Arc::new(inform_user::InformUserTool));

    // Long-form drafting
    registry.register(Arc::new(draft_email::DraftEmailTool::new(Arc::clone(&provider))));
    registry.register(Arc::new(generate_text_file::GenerateTextFileTool::new(provider)));

    // Documents
    registry.register(Arc::new(generate_report_pdf::GenerateReportPdfTool::new(artifacts)));

    registry
}

/// Stream an expanded version of `text`, emitting every non-empty chunk under
/// `field` and returning the concatenated result.
///
/// Stops reading early once the request is cancelled.
pub(crate) async fn stream_expansion(
    provider: &dyn GenerationProvider,
    text: &str,
    emitter: &ToolEmitter,
    field: &str,
) -> Result<String, ToolError> {
    let mut stream = provider.stream_text(&expansion_prompt(text)).await?;
    let mut full = String::new();

    while let Some(chunk) = stream.next().await {
        if emitter.is_cancelled() {
            debug!(field, "expansion stream abandoned after cancellation");
            break;
        }
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        emitter.emit(chunk.as_str(), field);
        full.push_str(&chunk);
    }
    Ok(full)
}
