// ── Core error types ──
//
// User-facing errors from wakely-core. Every variant maps to a chat
// notice somewhere in the engine; none of them terminate the process.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Validation errors ────────────────────────────────────────────
    #[error("invalid MAC address: {input}")]
    InvalidMac { input: String },

    #[error("device name must not be empty")]
    EmptyName,

    #[error("device name already in use: {name}")]
    DuplicateName { name: String },

    #[error("device not found: {name}")]
    NotFound { name: String },

    // ── Infrastructure errors ────────────────────────────────────────
    /// Registry could not be written to disk. The in-memory mutation
    /// that triggered the persist is kept (best-effort consistency).
    #[error("failed to persist device registry: {reason}")]
    Persistence { reason: String },

    /// The local stack rejected the UDP write. WoL is unacknowledged,
    /// so this is the only transmission failure we can ever observe.
    #[error("failed to transmit magic packet: {reason}")]
    Transmission { reason: String },

    /// Outbound chat message could not be delivered.
    #[error("failed to deliver message: {reason}")]
    Delivery { reason: String },

    // ── Access control ───────────────────────────────────────────────
    #[error("unauthorized session: {session}")]
    Unauthorized { session: i64 },
}
