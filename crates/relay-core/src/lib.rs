pub mod errors;
pub mod ids;
pub mod parts;
pub mod patch;
pub mod protocol;
pub mod provider;
pub mod session;
pub mod sink;
pub mod tools;

pub use patch::{Patch, PatchMode};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{Session, SessionSlot};
pub use sink::{CollectingSink, PatchSink};
