use std::collections::HashMap;
use std::sync::Arc;

use relay_core::tools::{Tool, ToolDescriptor};

/// Catalog of invocable tools.
///
/// Populated once at startup and then shared read-only across connections.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let _ = self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Declarations sent upstream, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut defs: Vec<ToolDescriptor> = self.tools.values().map(|t| t.to_descriptor()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::tools::{ToolEmitter, ToolError};
    use serde_json::Value;

    struct DummyTool {
        name: String,
    }

    impl DummyTool {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
            }
        }
    }

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "A dummy tool for testing"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _args: Value, _emitter: &ToolEmitter) -> Result<Option<Value>, ToolError> {
            Ok(None)
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool::new("informUser")));

        assert!(registry.contains("informUser"));
        assert!(!registry.contains("draftEmail"));
        assert_eq!(registry.count(), 1);
        assert!(registry.get("informUser").is_some());
        assert!(registry.get("draftEmail").is_none());
    }

    #[test]
    fn reregistering_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool::new("informUser")));
        registry.register(Arc::new(DummyTool::new("informUser")));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn names_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool::new("informUser")));
        registry.register(Arc::new(DummyTool::new("draftEmail")));
        registry.register(Arc::new(DummyTool::new("generateTextFile")));

        assert_eq!(
            registry.names(),
            vec!["draftEmail", "generateTextFile", "informUser"]
        );
    }

    #[test]
    fn descriptors_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool::new("informUser")));
        registry.register(Arc::new(DummyTool::new("draftEmail")));

        let defs = registry.descriptors();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "draftEmail");
        assert_eq!(defs[1].name, "informUser");
        assert_eq!(defs[0].description, "A dummy tool for testing");
    }

    #[test]
    fn empty_registry() {
        let registry = ToolRegistry::default();
        assert_eq!(registry.count(), 0);
        assert!(registry.names().is_empty());
        assert!(registry.descriptors().is_empty());
    }
}
