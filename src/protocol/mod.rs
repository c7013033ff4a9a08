//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Frame Format (big-endian)
//!
//! Every top-level frame is a catalog packet inside two wrappers:
//!
//! ```text
//! ┌───────────┬──────────┬─────────────┬────────────────┬─────────────────────┐
//! │ Magic (2) │ Kind (1) │ HasToken(1) │ [Token (32)]   │ Kind-specific bytes │
//! └───────────┴──────────┴─────────────┴────────────────┴─────────────────────┘
//! ```
//!
//! The 32 token bytes are present only when `HasToken` is 1.
//!
//! ### Message Kinds
//! - 0x01: REGISTER       - name + public key components
//! - 0x02: LOGIN          - name
//! - 0x03: LOGIN_RESPONSE - encrypted session token (empty = not registered)
//! - 0x04: KEY            - name
//! - 0x05: KEY_RESPONSE   - public key components (0/0 = not found)
//! - 0x06: CREATE         - recipient + message bytes
//! - 0x07: READ           - empty
//! - 0x08: READ_RESPONSE  - count + more flag + nested message records
//!
//! Every variable-length field is preceded by an explicit length field
//! in its packet's header; there are no terminator bytes.

mod frame;
mod kind;
mod packets;
mod wrapper;

pub use frame::{take, FieldKind, FieldValue, HeaderTemplate};
pub use kind::MessageKind;
pub use packets::{
    CreateRequest, KeyRequest, KeyResponse, LoginRequest, LoginResponse, Message, ReadRequest,
    ReadResponse, RegistrationRequest, MAX_MESSAGES_PER_RESPONSE, MAX_NAME_LENGTH,
};
pub use wrapper::{unwrap_session, unwrap_type, wrap_session, wrap_type, MAGIC_NUMBER};
