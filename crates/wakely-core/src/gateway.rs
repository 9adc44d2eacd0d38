// ── Messaging gateway seam ──
//
// The engine talks to the chat transport exclusively through this
// trait. The binary implements it over Telegram; tests use an
// in-memory recorder.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::event::{MessageId, SessionId};

/// One inline button: a label and the callback payload delivered back
/// as a [`Selection`](crate::event::Selection) wire string when tapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self { label: label.into(), data: data.into() }
    }
}

/// Outbound contract the core consumes. All failures are
/// [`CoreError::Delivery`]; none are fatal to the event loop.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, session: SessionId, text: &str) -> Result<(), CoreError>;

    /// Send a message with an inline keyboard and return its id so the
    /// prompt can be retracted later.
    async fn send_menu(
        &self,
        session: SessionId,
        text: &str,
        rows: &[Vec<Button>],
    ) -> Result<MessageId, CoreError>;

    /// Delete a previously sent prompt. Best effort: the message may
    /// already be gone.
    async fn retract(&self, session: SessionId, message: MessageId) -> Result<(), CoreError>;

    /// Replace the persistent reply keyboard with the current device
    /// names (an `/add` shortcut when empty).
    async fn refresh_keyboard(
        &self,
        session: SessionId,
        names: &[String],
    ) -> Result<(), CoreError>;
}
