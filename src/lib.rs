//! Conversational session engine for the Apex chat client.
//!
//! The engine turns raw user intent (typed text, an optional attached file,
//! and a set of feature toggles) into one request per turn to a remote
//! chat-completion endpoint, and reduces the response back into an ordered,
//! append-only conversation. Presentation layers consume snapshots and
//! change events; they never mutate state directly.

pub mod attachment;
pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod render;
pub mod session;
pub mod types;

pub use attachment::{Attachment, read_attachment};
pub use client::{CompletionBackend, HttpCompletionClient};
pub use config::{EngineConfig, Model, ToggleConfig};
pub use error::{SessionError, SessionResult};
pub use prompt::compose;
pub use session::{ChatSession, SessionEvent};
pub use types::{ChatMessage, Role};
