//! Cursor-based reader for the primitive wire types

use crate::error::{BitmessageError, Result};

/// Reads wire values from a borrowed byte slice.
///
/// Every read either consumes exactly the bytes of one value or fails
/// without returning partial data.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Reader<'a> {
        Reader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes consumed between `start` and the current position
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.data[start.min(self.pos)..self.pos]
    }

    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(BitmessageError::TruncatedInput {
                needed: count,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Consume everything that is left
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    pub fn uint8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn uint16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn uint32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn uint64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub fn int32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn int64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    /// Read a varint, rejecting encodings that are longer than necessary.
    pub fn var_int(&mut self) -> Result<u64> {
        let start = self.pos;
        let marker = self.uint8()?;
        let result = match marker {
            0xFD => self.uint16().map(u64::from).and_then(|v| minimal(v, 0xFD)),
            0xFE => self.uint32().map(u64::from).and_then(|v| minimal(v, 0x1_0000)),
            0xFF => self.uint64().and_then(|v| minimal(v, 0x1_0000_0000)),
            value => Ok(u64::from(value)),
        };
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Varint that must fit a `usize` and not exceed `limit`
    pub fn var_len(&mut self, limit: usize) -> Result<usize> {
        let start = self.pos;
        let length = self.var_int()?;
        if length > limit as u64 {
            self.pos = start;
            return Err(BitmessageError::Format(format!(
                "Length {length} exceeds limit {limit}"
            )));
        }
        Ok(length as usize)
    }

    pub fn var_bytes(&mut self, limit: usize) -> Result<&'a [u8]> {
        let start = self.pos;
        let length = self.var_len(limit)?;
        match self.bytes(length) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }

    pub fn var_string(&mut self, limit: usize) -> Result<String> {
        let start = self.pos;
        let raw = self.var_bytes(limit)?;
        String::from_utf8(raw.to_vec()).map_err(|e| {
            self.pos = start;
            BitmessageError::Format(format!("Invalid UTF-8 string: {e}"))
        })
    }

    pub fn var_int_list(&mut self, limit: usize) -> Result<Vec<u64>> {
        let count = self.var_len(limit)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.var_int()?);
        }
        Ok(values)
    }
}

fn minimal(value: u64, lower_bound: u64) -> Result<u64> {
    if value < lower_bound {
        return Err(BitmessageError::Format(format!(
            "Varint {value} is not minimally encoded"
        )));
    }
    Ok(value)
}
