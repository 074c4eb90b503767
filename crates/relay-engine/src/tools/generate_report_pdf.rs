use std::sync::Arc;

use async_trait::async_trait;
use relay_core::tools::{Tool, ToolEmitter, ToolError};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::pdf::render_report;

const REPORT_TITLE: &str = "Generated Report";

/// Renders `reportData` into a PDF artifact.
///
/// The file name and retrieval paths are emitted before rendering starts so
/// the client can link the document while it is still being written.
pub struct GenerateReportPdfTool {
    artifacts: Arc<dyn ArtifactStore>,
}

impl GenerateReportPdfTool {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { artifacts }
    }
}

fn report_lines(data: &Map<String, Value>) -> Vec<String> {
    data.iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect()
}

#[async_trait]
impl Tool for GenerateReportPdfTool {
    fn name(&self) -> &str {
        "generateReportPDF"
    }

    fn description(&self) -> &str {
        "Generates a PDF file based on the provided report data, including formatting and layout."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reportData": {
                    "type": "object",
                    "description": "An object containing all the necessary data to be included in the PDF report, such as titles, tables, charts, and text content."
                }
            },
            "required": ["reportData"]
        })
    }

    async fn execute(&self, args: Value, emitter: &ToolEmitter) -> Result<Option<Value>, ToolError> {
        let data = args
            .get("reportData")
            .and_then(Value::as_object)
            .ok_or_else(|| ToolError::InvalidArguments("reportData must be an object".into()))?;

        let file_name = format!("report_{}.pdf", chrono::Utc::now().timestamp_millis());
        let local_path = self.artifacts.local_path(&file_name);
        emitter.emit(file_name.as_str(), "fileName");
        emitter.emit(self.artifacts.public_path(&file_name), "publicUrl");
        emitter.emit(local_path.display().to_string(), "filePath");

        let bytes = render_report(REPORT_TITLE, &report_lines(data));
        let written = self
            .artifacts
            .write(&file_name, &bytes)
            .await
            .map_err(|e| ToolError::Artifact(e.to_string()))?;

        info!(path = %written.display(), entries = data.len(), "report generated");
        Ok(None)
    }
}
