//! Positional binary packing
//!
//! The token wire format carries no field tags: every value is written in a
//! fixed order and read back in the same order. Integers are little-endian,
//! byte strings and maps carry a `u16` length/count prefix.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("value too long to pack: {len} exceeds u16 length prefix")]
    TooLong { len: usize },

    #[error("packed string is not valid UTF-8")]
    InvalidUtf8,
}

/// Append-only writer for the token wire format
#[derive(Debug, Default)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `u16` length prefix followed by the raw bytes
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, PackError> {
        let len = prefix_len(bytes.len())?;
        self.put_u16(len);
        self.buf.extend_from_slice(bytes);
        Ok(self)
    }

    pub fn put_str(&mut self, s: &str) -> Result<&mut Self, PackError> {
        self.put_bytes(s.as_bytes())
    }

    /// Write a `u16` entry count, then each entry through `put_entry`
    pub fn put_map<I, K, V, F>(&mut self, entries: I, mut put_entry: F) -> Result<&mut Self, PackError>
    where
        I: IntoIterator<Item = (K, V)>,
        I::IntoIter: ExactSizeIterator,
        F: FnMut(&mut Self, K, V) -> Result<(), PackError>,
    {
        let entries = entries.into_iter();
        let count = prefix_len(entries.len())?;
        self.put_u16(count);
        for (key, value) in entries {
            put_entry(self, key, value)?;
        }
        Ok(self)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn prefix_len(len: usize) -> Result<u16, PackError> {
    u16::try_from(len).map_err(|_| PackError::TooLong { len })
}

/// Cursor over packed bytes; the inverse of [`Packer`]
#[derive(Debug, Clone)]
pub struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], PackError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(PackError::Truncated { needed, remaining });
        }
        let buf: &'a [u8] = self.buf;
        let slice = &buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], PackError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_u16(&mut self) -> Result<u16, PackError> {
        self.take_array().map(u16::from_le_bytes)
    }

    pub fn get_u32(&mut self) -> Result<u32, PackError> {
        self.take_array().map(u32::from_le_bytes)
    }

    pub fn get_bytes(&mut self) -> Result<&'a [u8], PackError> {
        let len = self.get_u16()? as usize;
        self.take(len)
    }

    pub fn get_string(&mut self) -> Result<String, PackError> {
        let bytes = self.get_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| PackError::InvalidUtf8)
    }

    /// Read a `u16` entry count, then each entry through `get_entry`
    pub fn get_map<T, F>(&mut self, mut get_entry: F) -> Result<Vec<T>, PackError>
    where
        F: FnMut(&mut Self) -> Result<T, PackError>,
    {
        let count = self.get_u16()? as usize;
        // Cap the preallocation; a forged count must not drive allocation
        let mut entries = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            entries.push(get_entry(self)?);
        }
        Ok(entries)
    }
}
