pub mod artifacts;
pub mod dispatcher;
pub mod error;
pub mod pdf;
pub mod prompt;
pub mod registry;
pub mod tools;

pub use artifacts::{ArtifactError, ArtifactStore, FsArtifactStore};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::EngineError;
pub use registry::ToolRegistry;
pub use tools::create_default_registry;
