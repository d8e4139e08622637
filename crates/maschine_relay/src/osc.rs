//! Minimal OSC 1.0 message encoder.
//!
//! Only single messages with zero or one string argument are produced,
//! which is all the button forwarding needs.

use crate::error::{Error, Result};

/// Encoded size of `s` as an OSC string: NUL terminated, padded to 4 bytes.
fn padded_len(s: &str) -> usize {
    (s.len() / 4 + 1) * 4
}

fn push_padded(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    let pad = padded_len(s) - s.len();
    buf.resize(buf.len() + pad, 0);
}

#[derive(Clone, Debug)]
pub struct OscEncoder {
    capacity: usize,
}

impl OscEncoder {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Encode `address` with an optional string argument.
    ///
    /// Fails if the message would exceed the buffer capacity.
    pub fn encode(&self, address: &str, value: Option<&str>) -> Result<Vec<u8>> {
        if !address.starts_with('/') {
            return Err(Error::InvalidOscString(format!(
                "address must start with '/': {address:?}"
            )));
        }
        if address.contains('\0') || value.is_some_and(|v| v.contains('\0')) {
            return Err(Error::InvalidOscString(
                "strings must not contain NUL bytes".to_string(),
            ));
        }

        let type_tag = if value.is_some() { ",s" } else { "," };
        let len = padded_len(address) + padded_len(type_tag) + value.map_or(0, padded_len);
        if len > self.capacity {
            return Err(Error::OscOverflow {
                len,
                capacity: self.capacity,
            });
        }

        let mut buf = Vec::with_capacity(len);
        push_padded(&mut buf, address);
        push_padded(&mut buf, type_tag);
        if let Some(value) = value {
            push_padded(&mut buf, value);
        }
        Ok(buf)
    }
}

impl Default for OscEncoder {
    fn default() -> Self {
        Self::new(1024)
    }
}
