use std::path::Path;

use tracing::warn;

use crate::error::{SessionError, SessionResult};

/// Soft breadcrumb threshold; reads stay unbounded.
const LARGE_ATTACHMENT_BYTES: usize = 1024 * 1024;

/// A file attached to one turn. Transient: cleared once the turn is
/// composed, whether or not the send succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content: String,
}

/// Read a user-selected file fully into memory as UTF-8 text.
pub fn read_attachment(path: &Path) -> SessionResult<Attachment> {
    let bytes = std::fs::read(path)
        .map_err(|err| SessionError::Read(format!("{}: {err}", path.display())))?;
    if bytes.len() > LARGE_ATTACHMENT_BYTES {
        warn!(path = %path.display(), bytes = bytes.len(), "large attachment read into memory");
    }
    let content = String::from_utf8(bytes)
        .map_err(|_| SessionError::Read(format!("{}: not valid UTF-8 text", path.display())))?;
    let name = path
        .file_name()
        .and_then(|stem| stem.to_str())
        .unwrap_or("attachment")
        .to_string();
    Ok(Attachment { name, content })
}
