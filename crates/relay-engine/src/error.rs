use relay_core::errors::GatewayError;
use relay_core::tools::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("tool {tool} failed: {source}")]
    Tool {
        tool: String,
        #[source]
        source: ToolError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_failing_tool() {
        let err = EngineError::Tool {
            tool: "draftEmail".into(),
            source: ToolError::InvalidArguments("to is required".into()),
        };
        assert_eq!(
            err.to_string(),
            "tool draftEmail failed: invalid arguments: to is required"
        );
    }

    #[test]
    fn gateway_conversion() {
        let err: EngineError = GatewayError::NetworkError("reset".into()).into();
        assert!(matches!(err, EngineError::Gateway(_)));
    }
}
