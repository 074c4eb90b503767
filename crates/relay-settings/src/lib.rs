//! Settings for the relay server.
//!
//! Defaults are compiled in, `~/.relay/settings.json` is deep-merged on top,
//! and environment variables override both.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings_from_path, settings_path};
pub use types::{ArtifactSettings, GeminiSettings, LoggingSettings, RelaySettings, ServerSettings};
