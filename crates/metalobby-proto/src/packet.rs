//! Packet type and typed field access.
//!
//! A `Packet` is the unit exchanged over a connection: an ordered list of
//! string fields, the first of which names the command. Outgoing packets are
//! assembled with the builder methods; incoming packets are consumed through a
//! [`PacketReader`], which interprets fields as strings, integers or booleans
//! in order.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// Ordered sequence of string fields.
///
/// # Invariants
///
/// - Field Order: fields are read back in exactly the order they were pushed.
///   The codec never reorders, merges or drops fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    fields: Vec<String>,
}

impl Packet {
    /// Start a packet whose first field is `command`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self { fields: vec![command.to_string()] }
    }

    /// Build a packet from raw fields.
    #[must_use]
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(Into::into).collect() }
    }

    /// Append a string field.
    #[must_use]
    pub fn string(mut self, value: &str) -> Self {
        self.fields.push(value.to_string());
        self
    }

    /// Append an integer field.
    #[must_use]
    pub fn int(mut self, value: i64) -> Self {
        self.fields.push(value.to_string());
        self
    }

    /// Append a boolean field.
    #[must_use]
    pub fn bool(mut self, value: bool) -> Self {
        self.fields.push(if value { "true" } else { "false" }.to_string());
        self
    }

    /// Command name. `None` for an empty packet.
    pub fn command(&self) -> Option<&str> {
        self.fields.first().map(String::as_str)
    }

    /// All fields, command included.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of fields, command included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the packet carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the packet into a sequential reader positioned at the command.
    #[must_use]
    pub fn into_reader(self) -> PacketReader {
        PacketReader { fields: self.fields.into_iter(), index: 0 }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}

/// Sequential typed reader over an incoming packet.
///
/// Every read consumes one field. Reading past the end or reading a field as
/// the wrong type is a [`ProtocolError`]; the reader does not rewind.
#[derive(Debug)]
pub struct PacketReader {
    fields: std::vec::IntoIter<String>,
    index: usize,
}

impl PacketReader {
    fn next_field(&mut self) -> Result<(usize, String)> {
        let index = self.index;
        let field = self.fields.next().ok_or(ProtocolError::MissingField { index })?;
        self.index += 1;
        Ok((index, field))
    }

    /// Read the next field as a string.
    pub fn read_string(&mut self) -> Result<String> {
        self.next_field().map(|(_, field)| field)
    }

    /// Read the next field as a signed integer.
    pub fn read_int(&mut self) -> Result<i64> {
        let (index, field) = self.next_field()?;
        field.parse().map_err(|_| ProtocolError::InvalidInt { index, value: field })
    }

    /// Read the next field as a boolean (`true`/`false`, or `1`/`0`).
    pub fn read_bool(&mut self) -> Result<bool> {
        let (index, field) = self.next_field()?;
        match field.as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ProtocolError::InvalidBool { index, value: field }),
        }
    }

    /// Fields not yet consumed.
    pub fn remaining(&self) -> usize {
        self.fields.len()
    }
}
