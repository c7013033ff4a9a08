//! Message kind definitions
//!
//! The closed enumeration identifying which catalog packet a frame
//! carries. The nested message record inside a read response is not
//! wire-tagged and so has no kind here.

use std::fmt;
use std::str::FromStr;

use crate::error::{MaildropError, Result};

/// Message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Register = 0x01,
    Login = 0x02,
    LoginResponse = 0x03,
    Key = 0x04,
    KeyResponse = 0x05,
    Create = 0x06,
    Read = 0x07,
    ReadResponse = 0x08,
}

impl MessageKind {
    /// Resolve a wire byte to a message kind.
    ///
    /// Unknown values are a decode failure, never a default.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(MessageKind::Register),
            0x02 => Ok(MessageKind::Login),
            0x03 => Ok(MessageKind::LoginResponse),
            0x04 => Ok(MessageKind::Key),
            0x05 => Ok(MessageKind::KeyResponse),
            0x06 => Ok(MessageKind::Create),
            0x07 => Ok(MessageKind::Read),
            0x08 => Ok(MessageKind::ReadResponse),
            other => Err(MaildropError::Frame(format!(
                "Invalid message kind ID number: 0x{:02x}",
                other
            ))),
        }
    }

    /// The response kind a request kind is answered with, if any
    pub fn response_kind(self) -> Option<MessageKind> {
        match self {
            MessageKind::Login => Some(MessageKind::LoginResponse),
            MessageKind::Key => Some(MessageKind::KeyResponse),
            MessageKind::Read => Some(MessageKind::ReadResponse),
            _ => None,
        }
    }

    /// Whether this kind is a client request
    pub fn is_request(self) -> bool {
        matches!(
            self,
            MessageKind::Register
                | MessageKind::Login
                | MessageKind::Key
                | MessageKind::Create
                | MessageKind::Read
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Register => "REGISTER",
            MessageKind::Login => "LOGIN",
            MessageKind::LoginResponse => "LOGIN_RESPONSE",
            MessageKind::Key => "KEY",
            MessageKind::KeyResponse => "KEY_RESPONSE",
            MessageKind::Create => "CREATE",
            MessageKind::Read => "READ",
            MessageKind::ReadResponse => "READ_RESPONSE",
        };
        f.write_str(name)
    }
}

impl FromStr for MessageKind {
    type Err = MaildropError;

    /// Parse an interactive command word into a request kind
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "register" => Ok(MessageKind::Register),
            "login" => Ok(MessageKind::Login),
            "key" => Ok(MessageKind::Key),
            "create" => Ok(MessageKind::Create),
            "read" => Ok(MessageKind::Read),
            other => Err(MaildropError::Validation(format!(
                "Invalid request type: {}",
                other
            ))),
        }
    }
}
