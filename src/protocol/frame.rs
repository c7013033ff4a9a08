//! Frame codec
//!
//! Declarative fixed-width header templates shared by every packet type.
//!
//! A packet type declares its header as an ordered list of fixed-width
//! fields. Encoding packs a value for each field; decoding splits off
//! exactly the header's byte length, parses it per the template, and
//! returns everything after it unconsumed. Payload parsing stays with
//! the concrete packet type.
//!
//! Every variable-length payload field is measured by an explicit
//! length field in the header, so decoding never scans for delimiters.

use crate::error::{MaildropError, Result};

/// The recognized fixed-width header field kinds.
///
/// The set is closed, so a packet type cannot declare an unrecognized
/// field kind in the first place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer, big-endian
    U16,
    /// Single-byte boolean, 0 or 1
    Bool,
}

impl FieldKind {
    /// Encoded width of the field in bytes
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::Bool => 1,
            FieldKind::U16 => 2,
        }
    }
}

/// A concrete value for one header field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    Bool(bool),
}

impl FieldValue {
    /// The field kind this value belongs to
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::U8(_) => FieldKind::U8,
            FieldValue::U16(_) => FieldKind::U16,
            FieldValue::Bool(_) => FieldKind::Bool,
        }
    }

    /// Interpret the value as a payload length
    pub fn as_len(&self) -> Result<usize> {
        match self {
            FieldValue::U8(value) => Ok(*value as usize),
            FieldValue::U16(value) => Ok(*value as usize),
            FieldValue::Bool(_) => Err(MaildropError::Frame(
                "Boolean header field used as a length".to_string(),
            )),
        }
    }

    /// Interpret the value as a count
    pub fn as_u8(&self) -> Result<u8> {
        match self {
            FieldValue::U8(value) => Ok(*value),
            other => Err(MaildropError::Frame(format!(
                "Expected a u8 header field, found {:?}",
                other.kind()
            ))),
        }
    }

    /// Interpret the value as a u16
    pub fn as_u16(&self) -> Result<u16> {
        match self {
            FieldValue::U16(value) => Ok(*value),
            other => Err(MaildropError::Frame(format!(
                "Expected a u16 header field, found {:?}",
                other.kind()
            ))),
        }
    }

    /// Interpret the value as a boolean
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            FieldValue::Bool(value) => Ok(*value),
            other => Err(MaildropError::Frame(format!(
                "Expected a boolean header field, found {:?}",
                other.kind()
            ))),
        }
    }
}

/// An ordered, fixed-width header layout for one packet type
#[derive(Debug, Clone, Copy)]
pub struct HeaderTemplate {
    fields: &'static [FieldKind],
}

impl HeaderTemplate {
    /// Declare a header template from its ordered field kinds
    pub const fn new(fields: &'static [FieldKind]) -> Self {
        Self { fields }
    }

    /// Total encoded size of the header in bytes
    pub const fn size(&self) -> usize {
        let mut total = 0;
        let mut index = 0;
        while index < self.fields.len() {
            total += self.fields[index].width();
            index += 1;
        }
        total
    }

    /// Pack one value per template field into header bytes.
    ///
    /// A value count or kind that disagrees with the template is an
    /// integration mistake, reported before any bytes reach a socket.
    pub fn pack(&self, values: &[FieldValue]) -> Result<Vec<u8>> {
        if values.len() != self.fields.len() {
            return Err(MaildropError::Frame(format!(
                "Header template has {} field(s) but {} value(s) were supplied",
                self.fields.len(),
                values.len()
            )));
        }

        let mut header = Vec::with_capacity(self.size());

        for (kind, value) in self.fields.iter().zip(values) {
            if value.kind() != *kind {
                return Err(MaildropError::Frame(format!(
                    "Header value {:?} does not match declared field {:?}",
                    value.kind(),
                    kind
                )));
            }

            match value {
                FieldValue::U8(v) => header.push(*v),
                FieldValue::U16(v) => header.extend_from_slice(&v.to_be_bytes()),
                FieldValue::Bool(v) => header.push(u8::from(*v)),
            }
        }

        Ok(header)
    }

    /// Split a frame into its parsed header fields and the unconsumed
    /// remainder.
    pub fn split<'a>(&self, bytes: &'a [u8]) -> Result<(Vec<FieldValue>, &'a [u8])> {
        if bytes.len() < self.size() {
            return Err(MaildropError::Frame(format!(
                "Incomplete header: expected {} byte(s), got {}",
                self.size(),
                bytes.len()
            )));
        }

        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 0;

        for kind in self.fields {
            match kind {
                FieldKind::U8 => {
                    values.push(FieldValue::U8(bytes[offset]));
                }
                FieldKind::U16 => {
                    values.push(FieldValue::U16(u16::from_be_bytes([
                        bytes[offset],
                        bytes[offset + 1],
                    ])));
                }
                FieldKind::Bool => {
                    values.push(FieldValue::Bool(bytes[offset] != 0));
                }
            }
            offset += kind.width();
        }

        Ok((values, &bytes[offset..]))
    }
}

/// Split `len` payload bytes off the front of `bytes`.
///
/// Used by packet types to consume length-measured payload fields.
pub fn take(bytes: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if bytes.len() < len {
        return Err(MaildropError::Frame(format!(
            "Incomplete payload: expected {} byte(s), got {}",
            len,
            bytes.len()
        )));
    }
    Ok(bytes.split_at(len))
}
