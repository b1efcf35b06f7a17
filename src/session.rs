use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::attachment::read_attachment;
use crate::client::{CompletionBackend, HttpCompletionClient};
use crate::config::{EngineConfig, Model, ToggleConfig};
use crate::error::SessionError;
use crate::prompt::compose;
use crate::types::ChatMessage;

/// Change notification pushed to subscribed presentation layers. Listeners
/// observe state; they never mutate it back into the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    MessageAppended,
    LoadingChanged(bool),
}

pub type Listener = Box<dyn Fn(SessionEvent) + Send + Sync>;

struct SessionState {
    messages: Vec<ChatMessage>,
    loading: bool,
    attachment: Option<PathBuf>,
    toggles: ToggleConfig,
}

/// The conversational session engine: ordered history, single-flight send
/// gate, and the turn pipeline from raw input to appended outcome.
///
/// History is append-only and lives for the lifetime of this object; a
/// failed turn keeps its user message visible and appends a diagnostic
/// instead of rolling back.
pub struct ChatSession {
    state: Mutex<SessionState>,
    backend: Box<dyn CompletionBackend>,
    listeners: Mutex<Vec<Listener>>,
}

impl ChatSession {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                messages: Vec::new(),
                loading: false,
                attachment: None,
                toggles: ToggleConfig::default(),
            }),
            backend,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Engine wired to the real endpoint, credential read from the
    /// environment once, here.
    pub fn from_env() -> Self {
        Self::new(Box::new(HttpCompletionClient::new(EngineConfig::from_env())))
    }

    pub fn subscribe(&self, listener: Listener) {
        let mut listeners = self.listeners.lock().expect("listeners poisoned");
        listeners.push(listener);
    }

    fn notify(&self, event: SessionEvent) {
        let listeners = self.listeners.lock().expect("listeners poisoned");
        for listener in listeners.iter() {
            listener(event);
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().expect("session state poisoned").messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().expect("session state poisoned").loading
    }

    pub fn toggles(&self) -> ToggleConfig {
        self.state.lock().expect("session state poisoned").toggles
    }

    /// Takes effect on the next turn; a send already in flight is not
    /// relabeled.
    pub fn set_toggles(&self, toggles: ToggleConfig) {
        self.state.lock().expect("session state poisoned").toggles = toggles;
    }

    pub fn set_model(&self, model: Model) {
        self.state.lock().expect("session state poisoned").toggles.model = model;
    }

    pub fn attach(&self, path: PathBuf) {
        self.state.lock().expect("session state poisoned").attachment = Some(path);
    }

    pub fn clear_attachment(&self) {
        self.state.lock().expect("session state poisoned").attachment = None;
    }

    pub fn attachment(&self) -> Option<PathBuf> {
        self.state
            .lock()
            .expect("session state poisoned")
            .attachment
            .clone()
    }

    /// Drive one turn. Returns `false` without mutating anything when a
    /// send is already in flight or there is nothing to send; `true` means
    /// the turn was accepted and ran to a terminal outcome (assistant
    /// message or diagnostic appended, loading cleared).
    pub async fn send(&self, text: &str) -> bool {
        // Acceptance gate: single flight plus the empty-input check. The
        // attachment is consumed here so it is cleared no matter how the
        // turn ends.
        let (attachment_path, toggles) = {
            let mut state = self.state.lock().expect("session state poisoned");
            if state.loading {
                debug!("send rejected: a turn is already in flight");
                return false;
            }
            if text.trim().is_empty() && state.attachment.is_none() {
                return false;
            }
            state.loading = true;
            (state.attachment.take(), state.toggles)
        };
        self.notify(SessionEvent::LoadingChanged(true));

        let attachment = match attachment_path {
            Some(path) => match read_attachment(&path) {
                Ok(file) => Some(file),
                Err(err) => {
                    warn!(error = %err, "attachment read failed");
                    self.append_error(&err);
                    return true;
                }
            },
            None => None,
        };

        // The acceptance gate mirrors compose's own validation, so this
        // only rejects if the two ever drift apart; back out cleanly then.
        let Some(prompt) = compose(text, attachment.as_ref(), toggles) else {
            self.state.lock().expect("session state poisoned").loading = false;
            self.notify(SessionEvent::LoadingChanged(false));
            return false;
        };

        let history = self.append_user(prompt);

        // The only suspension point: one request, whole answer or nothing.
        match self
            .backend
            .complete(toggles.model.wire_id(), &history)
            .await
        {
            Ok(message) => self.append_assistant(message),
            Err(err) => {
                warn!(error = %err, "completion failed");
                self.append_error(&err);
            }
        }
        true
    }

    fn append_user(&self, content: String) -> Vec<ChatMessage> {
        let history = {
            let mut state = self.state.lock().expect("session state poisoned");
            state.messages.push(ChatMessage::user(content));
            state.messages.clone()
        };
        self.notify(SessionEvent::MessageAppended);
        history
    }

    /// Append the terminal outcome and clear the loading flag in one
    /// critical section, so no observer sees a finished turn still loading.
    fn append_assistant(&self, message: ChatMessage) {
        {
            let mut state = self.state.lock().expect("session state poisoned");
            state.messages.push(message);
            state.loading = false;
        }
        self.notify(SessionEvent::MessageAppended);
        self.notify(SessionEvent::LoadingChanged(false));
    }

    /// Errors become part of the visible conversation: a synthetic
    /// assistant entry carrying the human-readable diagnostic.
    fn append_error(&self, err: &SessionError) {
        self.append_assistant(ChatMessage::assistant(err.diagnostic()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SessionError, SessionResult};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CannedBackend {
        reply: String,
        calls: Arc<AtomicU64>,
    }

    impl CannedBackend {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: Arc::new(AtomicU64::new(0)),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
        ) -> SessionResult<ChatMessage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatMessage::assistant(self.reply.clone()))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
        ) -> SessionResult<ChatMessage> {
            Err(SessionError::Network("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn simple_turn_appends_user_then_assistant() {
        let session = ChatSession::new(Box::new(CannedBackend::new("4")));
        assert!(session.send("What is 2+2?").await);

        let history = session.messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "What is 2+2?");
        assert_eq!(history[1].content, "4");
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_mutation() {
        let session = ChatSession::new(Box::new(CannedBackend::new("unused")));
        assert!(!session.send("   ").await);
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn backend_failure_becomes_visible_diagnostic() {
        let session = ChatSession::new(Box::new(FailingBackend));
        assert!(session.send("hello").await);

        let history = session.messages();
        assert_eq!(history.len(), 2);
        // The failed turn's user message is kept, not rolled back.
        assert_eq!(history[0].content, "hello");
        assert!(history[1].content.contains("connection refused"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn attachment_read_failure_skips_the_network() {
        let backend = CannedBackend::new("unused");
        let calls = backend.calls.clone();
        let session = ChatSession::new(Box::new(backend));
        session.attach(PathBuf::from("/nonexistent/apex-chat-input.txt"));

        assert!(session.send("look at this").await);

        let history = session.messages();
        assert_eq!(history.len(), 1);
        assert!(history[0].content.starts_with("Sorry,"));
        assert!(!session.is_loading());
        assert!(session.attachment().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn toggle_change_applies_to_next_turn_only() {
        let session = ChatSession::new(Box::new(CannedBackend::new("ok")));
        session.send("first").await;
        session.set_toggles(ToggleConfig {
            web_search: true,
            ..ToggleConfig::default()
        });
        session.send("second").await;

        let history = session.messages();
        assert_eq!(history[0].content, "first");
        assert!(history[2].content.contains("(Web search enabled)"));
    }
}
