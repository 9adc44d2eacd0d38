//! Core of the Wakely Wake-on-LAN bot.
//!
//! This crate owns everything with real invariants and none of the
//! transport plumbing:
//!
//! - **[`Engine`]** — per-operator conversation state machine. Routes
//!   commands, free text, and button selections into registry mutations
//!   and wake requests; tracks transient prompts so stale inline
//!   keyboards get retracted.
//!
//! - **[`DeviceRegistry`]** — ordered name → MAC registry with
//!   write-through JSON persistence.
//!
//! - **[`wol`]** — the 102-byte magic-packet codec and the UDP
//!   broadcast sender behind the [`PacketSender`] seam.
//!
//! - **[`MessageGateway`]** — the outbound chat contract the engine
//!   consumes. The Telegram implementation lives in the `wakely`
//!   binary; tests plug in an in-memory fake.

pub mod engine;
pub mod error;
pub mod event;
pub mod gateway;
pub mod model;
pub mod registry;
pub mod wol;

// ── Primary re-exports ──────────────────────────────────────────────
pub use engine::{Engine, Flow};
pub use error::CoreError;
pub use event::{Command, Event, EventKind, MessageId, Selection, SessionId};
pub use gateway::{Button, MessageGateway};
pub use model::{Device, MacAddress};
pub use registry::DeviceRegistry;
pub use wol::{MAGIC_PACKET_LEN, PacketSender, UdpBroadcastSender, magic_packet};
