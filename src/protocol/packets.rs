//! Packet catalog
//!
//! The concrete request and response packet types, built on the header
//! template codec. Each type declares its header layout and carries the
//! payload rules for its variable-length fields.

use crate::crypto::PublicKey;
use crate::error::{MaildropError, Result};

use super::frame::{take, FieldKind, FieldValue, HeaderTemplate};

/// Maximum encoded length of a user name in bytes
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum number of message records in one read response
pub const MAX_MESSAGES_PER_RESPONSE: usize = 255;

/// Validate a name field for encoding, returning its bytes
fn name_bytes<'a>(name: &'a str, what: &str) -> Result<&'a [u8]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return Err(MaildropError::Validation(format!("Empty {}", what)));
    }
    if bytes.len() > MAX_NAME_LENGTH {
        return Err(MaildropError::Validation(format!(
            "{} consumes more than {} bytes",
            what, MAX_NAME_LENGTH
        )));
    }
    Ok(bytes)
}

/// Decode a name field from payload bytes
fn decode_name(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| MaildropError::Validation(format!("{} is not valid UTF-8", what)))
}

// =============================================================================
// Registration
// =============================================================================

/// Request to register a name and public key
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub user_name: String,
    pub public_key: PublicKey,
}

impl RegistrationRequest {
    const HEADER: HeaderTemplate =
        HeaderTemplate::new(&[FieldKind::U8, FieldKind::U16, FieldKind::U16]);

    pub fn new(user_name: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            user_name: user_name.into(),
            public_key,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = name_bytes(&self.user_name, "user name")?;
        let (modulus, exponent) = self.public_key.components();

        let mut packet = Self::HEADER.pack(&[
            FieldValue::U8(name.len() as u8),
            FieldValue::U16(modulus.len() as u16),
            FieldValue::U16(exponent.len() as u16),
        ])?;

        packet.extend_from_slice(name);
        packet.extend_from_slice(&modulus);
        packet.extend_from_slice(&exponent);

        Ok(packet)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let name_len = fields[0].as_len()?;
        let modulus_len = fields[1].as_len()?;
        let exponent_len = fields[2].as_len()?;

        if name_len == 0 {
            return Err(MaildropError::Validation(
                "Registration request with empty user name".to_string(),
            ));
        }

        let (name, rest) = take(payload, name_len)?;
        let (modulus, rest) = take(rest, modulus_len)?;
        let (exponent, _) = take(rest, exponent_len)?;

        Ok(Self {
            user_name: decode_name(name, "user name")?,
            public_key: PublicKey::from_components(modulus, exponent)?,
        })
    }
}

// =============================================================================
// Login
// =============================================================================

/// Request to log in under a registered name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub user_name: String,
}

impl LoginRequest {
    const HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U8]);

    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = name_bytes(&self.user_name, "user name")?;

        let mut packet = Self::HEADER.pack(&[FieldValue::U8(name.len() as u8)])?;
        packet.extend_from_slice(name);

        Ok(packet)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let name_len = fields[0].as_len()?;

        if name_len == 0 {
            return Err(MaildropError::Validation(
                "Login request with empty user name".to_string(),
            ));
        }

        let (name, _) = take(payload, name_len)?;

        Ok(Self {
            user_name: decode_name(name, "user name")?,
        })
    }
}

/// Response to a login request.
///
/// Carries the fresh session token encrypted under the caller's
/// registered public key. A zero-length token means the name is not
/// registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub encrypted_token: Vec<u8>,
}

impl LoginResponse {
    const HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U16]);

    pub fn new(encrypted_token: Vec<u8>) -> Self {
        Self { encrypted_token }
    }

    /// The "please register first" sentinel
    pub fn not_registered() -> Self {
        Self {
            encrypted_token: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut packet =
            Self::HEADER.pack(&[FieldValue::U16(self.encrypted_token.len() as u16)])?;
        packet.extend_from_slice(&self.encrypted_token);

        Ok(packet)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let token_len = fields[0].as_len()?;

        let (token, _) = take(payload, token_len)?;

        Ok(Self {
            encrypted_token: token.to_vec(),
        })
    }
}

// =============================================================================
// Key lookup
// =============================================================================

/// Request for another user's public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    pub user_name: String,
}

impl KeyRequest {
    const HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U8]);

    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let name = name_bytes(&self.user_name, "user name")?;

        let mut packet = Self::HEADER.pack(&[FieldValue::U8(name.len() as u8)])?;
        packet.extend_from_slice(name);

        Ok(packet)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let name_len = fields[0].as_len()?;

        let (name, _) = take(payload, name_len)?;

        Ok(Self {
            user_name: decode_name(name, "user name")?,
        })
    }
}

/// Response to a key request.
///
/// Zero-length components are the "not found" sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyResponse {
    pub public_key: Option<PublicKey>,
}

impl KeyResponse {
    const HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U16, FieldKind::U16]);

    pub fn new(public_key: Option<PublicKey>) -> Self {
        Self { public_key }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let (modulus, exponent) = match &self.public_key {
            Some(key) => key.components(),
            None => (Vec::new(), Vec::new()),
        };

        let mut packet = Self::HEADER.pack(&[
            FieldValue::U16(modulus.len() as u16),
            FieldValue::U16(exponent.len() as u16),
        ])?;

        packet.extend_from_slice(&modulus);
        packet.extend_from_slice(&exponent);

        Ok(packet)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let modulus_len = fields[0].as_len()?;
        let exponent_len = fields[1].as_len()?;

        if modulus_len == 0 && exponent_len == 0 {
            return Ok(Self { public_key: None });
        }

        let (modulus, rest) = take(payload, modulus_len)?;
        let (exponent, _) = take(rest, exponent_len)?;

        Ok(Self {
            public_key: Some(PublicKey::from_components(modulus, exponent)?),
        })
    }
}

// =============================================================================
// Create
// =============================================================================

/// Request to deliver a message to another user's mailbox.
///
/// The sender is taken from the session wrapper, never from the packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub recipient_name: String,
    pub message: Vec<u8>,
}

impl CreateRequest {
    const HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U8, FieldKind::U16]);

    pub fn new(recipient_name: impl Into<String>, message: Vec<u8>) -> Self {
        Self {
            recipient_name: recipient_name.into(),
            message,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let recipient = name_bytes(&self.recipient_name, "recipient name")?;

        if self.message.is_empty() {
            return Err(MaildropError::Validation(
                "Empty message in create request".to_string(),
            ));
        }
        if self.message.len() > u16::MAX as usize {
            return Err(MaildropError::Validation(
                "Message is too long to encode".to_string(),
            ));
        }

        let mut packet = Self::HEADER.pack(&[
            FieldValue::U8(recipient.len() as u8),
            FieldValue::U16(self.message.len() as u16),
        ])?;

        packet.extend_from_slice(recipient);
        packet.extend_from_slice(&self.message);

        Ok(packet)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let recipient_len = fields[0].as_len()?;
        let message_len = fields[1].as_len()?;

        if recipient_len == 0 {
            return Err(MaildropError::Validation(
                "Create request with empty recipient name".to_string(),
            ));
        }
        if message_len == 0 {
            return Err(MaildropError::Validation(
                "Create request with empty message".to_string(),
            ));
        }

        let (recipient, rest) = take(payload, recipient_len)?;
        let (message, _) = take(rest, message_len)?;

        Ok(Self {
            recipient_name: decode_name(recipient, "recipient name")?,
            message: message.to_vec(),
        })
    }
}

// =============================================================================
// Read
// =============================================================================

/// Request to read pending messages.
///
/// Carries nothing: the identity comes from the session wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadRequest;

impl ReadRequest {
    pub fn new() -> Self {
        Self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    pub fn decode(_bytes: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// One pending message, nested inside a read response.
///
/// Not wire-tagged: it only ever appears back-to-back in a read
/// response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender_name: String,
    pub body: Vec<u8>,
}

impl Message {
    const HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U8, FieldKind::U16]);

    pub fn new(sender_name: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            sender_name: sender_name.into(),
            body,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let sender = name_bytes(&self.sender_name, "sender name")?;

        if self.body.len() > u16::MAX as usize {
            return Err(MaildropError::Validation(
                "Message body is too long to encode".to_string(),
            ));
        }

        let mut packet = Self::HEADER.pack(&[
            FieldValue::U8(sender.len() as u8),
            FieldValue::U16(self.body.len() as u16),
        ])?;

        packet.extend_from_slice(sender);
        packet.extend_from_slice(&self.body);

        Ok(packet)
    }

    /// Decode one message record, returning it and the remaining bytes
    /// for any records that follow.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let sender_len = fields[0].as_len()?;
        let body_len = fields[1].as_len()?;

        let (sender, rest) = take(payload, sender_len)?;
        let (body, remaining) = take(rest, body_len)?;

        let message = Self {
            sender_name: decode_name(sender, "sender name")?,
            body: body.to_vec(),
        };

        Ok((message, remaining))
    }
}

/// Response to a read request.
///
/// Holds up to 255 message records; `more_messages` reports whether the
/// mailbox still has entries after this batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub messages: Vec<Message>,
    pub more_messages: bool,
}

impl ReadResponse {
    const HEADER: HeaderTemplate = HeaderTemplate::new(&[FieldKind::U8, FieldKind::Bool]);

    /// Build a response, capping at the per-response maximum. Messages
    /// beyond the cap are dropped here and reported via `more_messages`;
    /// the caller keeps them queued.
    pub fn new(mut messages: Vec<Message>, more_messages: bool) -> Self {
        let more = more_messages || messages.len() > MAX_MESSAGES_PER_RESPONSE;
        messages.truncate(MAX_MESSAGES_PER_RESPONSE);

        Self {
            messages,
            more_messages: more,
        }
    }

    /// A response carrying no messages
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            more_messages: false,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut packet = Self::HEADER.pack(&[
            FieldValue::U8(self.messages.len() as u8),
            FieldValue::Bool(self.more_messages),
        ])?;

        for message in &self.messages {
            packet.extend_from_slice(&message.to_bytes()?);
        }

        Ok(packet)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (fields, payload) = Self::HEADER.split(bytes)?;
        let count = fields[0].as_u8()? as usize;
        let more_messages = fields[1].as_bool()?;

        let mut messages = Vec::with_capacity(count);
        let mut remaining = payload;

        for _ in 0..count {
            let (message, rest) = Message::decode(remaining)?;
            messages.push(message);
            remaining = rest;
        }

        Ok(Self {
            messages,
            more_messages,
        })
    }
}
