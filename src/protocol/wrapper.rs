//! Wrapper composition
//!
//! Two header-only packets that nest around a catalog packet. The type
//! wrapper carries the magic number and message kind; the session
//! wrapper carries an optional session token. Applied outermost-first
//! on encode, stripped outermost-first on decode, so the dispatcher can
//! resolve what kind of request arrived and who is asking before any
//! kind-specific payload logic runs.

use crate::crypto::{SessionToken, SESSION_TOKEN_LENGTH};
use crate::error::{MaildropError, Result};

use super::frame::{take, FieldKind, FieldValue, HeaderTemplate};
use super::kind::MessageKind;

/// Fixed constant at the start of every type-wrapped frame. Any
/// mismatch is a hard decode failure, guarding against reading a
/// foreign or garbled stream as a request.
pub const MAGIC_NUMBER: u16 = 0xAE73;

const TYPE_HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U16, FieldKind::U8]);

const SESSION_HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::Bool]);

// =============================================================================
// Type wrapper
// =============================================================================

/// Prepend the magic number and message kind to an encoded packet
pub fn wrap_type(kind: MessageKind, inner: &[u8]) -> Result<Vec<u8>> {
    let mut packet = TYPE_HEADER.pack(&[
        FieldValue::U16(MAGIC_NUMBER),
        FieldValue::U8(kind as u8),
    ])?;

    packet.extend_from_slice(inner);

    Ok(packet)
}

/// Strip the type wrapper, validating the magic number and resolving
/// the message kind.
pub fn unwrap_type(bytes: &[u8]) -> Result<(MessageKind, &[u8])> {
    let (fields, inner) = TYPE_HEADER.split(bytes)?;
    let magic = fields[0].as_u16()?;
    let kind_byte = fields[1].as_u8()?;

    if magic != MAGIC_NUMBER {
        return Err(MaildropError::Frame(format!(
            "Incorrect magic number in packet: 0x{:04x}",
            magic
        )));
    }

    let kind = MessageKind::from_byte(kind_byte)?;

    Ok((kind, inner))
}

// =============================================================================
// Session wrapper
// =============================================================================

/// Prepend the session token, or a "no token" marker, to an encoded
/// packet.
pub fn wrap_session(token: Option<&SessionToken>, inner: &[u8]) -> Result<Vec<u8>> {
    let mut packet = SESSION_HEADER.pack(&[FieldValue::Bool(token.is_some())])?;

    if let Some(token) = token {
        packet.extend_from_slice(token.as_bytes());
    }

    packet.extend_from_slice(inner);

    Ok(packet)
}

/// Strip the session wrapper, returning the token (if present) and the
/// inner packet bytes.
pub fn unwrap_session(bytes: &[u8]) -> Result<(Option<SessionToken>, &[u8])> {
    let (fields, rest) = SESSION_HEADER.split(bytes)?;
    let has_token = fields[0].as_bool()?;

    if !has_token {
        return Ok((None, rest));
    }

    let (token_bytes, inner) = take(rest, SESSION_TOKEN_LENGTH)?;
    let token = SessionToken::from_bytes(token_bytes)?;

    Ok((Some(token), inner))
}
