pub mod google;
pub mod mock;
pub mod sse;
pub mod types;

pub use google::{GeminiConfig, GoogleProvider};
pub use mock::{MockProvider, MockResponse, MockStream};
