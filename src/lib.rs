//! # maildrop
//!
//! A store-and-forward messaging service:
//! - Binary wire protocol with self-describing, length-prefixed frames
//! - Session tokens minted at login, delivered encrypted to the caller
//! - Public key exchange between users for end-to-end message secrecy
//! - Per-user FIFO mailboxes held in memory on a single server
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Readiness Event Loop                       │
//! │              (single thread, mio::Poll)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one decode-and-handle cycle
//!                       │ per readable socket
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Wrapper Decoding                            │
//! │        [magic | kind]  →  [token?]  →  payload               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │               Session/Mailbox Engine                         │
//! │     users: name → key      sessions: token → name            │
//! │          mailboxes: name → FIFO of (sender, body)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests flow through two wrappers before the kind-specific packet:
//! the type wrapper (magic number + message kind) and the session
//! wrapper (optional 32-byte session token). The server resolves who
//! is asking before touching any kind-specific payload logic.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod crypto;
pub mod error;

pub mod network;
pub mod protocol;
pub mod session;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{MaildropError, Result};
pub use session::ServerState;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of maildrop
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
