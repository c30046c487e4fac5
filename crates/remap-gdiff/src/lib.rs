//! Apply GDiff deltas (format version 4).
//!
//! A delta is a 5-byte header followed by a command stream. Each command
//! either appends literal bytes carried in the delta or copies a range of the
//! original. All integers are big-endian.
//!
//! ```text
//! D1 FF D1 FF 04          header
//! 0                       EOF
//! 1..=246                 data, length = command
//! 247 u16 / 248 i32       data, explicit length
//! 249 u16 u8   250 u16 u16   251 u16 i32
//! 252 i32 u8   253 i32 u16   254 i32 i32
//! 255 i64 i32             copy (offset, length)
//! ```

use thiserror::Error;
use tracing::trace;

pub const MAGIC: [u8; 4] = [0xD1, 0xFF, 0xD1, 0xFF];
pub const VERSION: u8 = 4;

const EOF: u8 = 0;
const DATA_MAX: u8 = 246;
const DATA_USHORT: u8 = 247;
const DATA_INT: u8 = 248;
const COPY_USHORT_UBYTE: u8 = 249;
const COPY_USHORT_USHORT: u8 = 250;
const COPY_USHORT_INT: u8 = 251;
const COPY_INT_UBYTE: u8 = 252;
const COPY_INT_USHORT: u8 = 253;
const COPY_INT_INT: u8 = 254;
const COPY_LONG_INT: u8 = 255;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("not a GDiff delta (bad magic)")]
    BadMagic,

    #[error("unsupported GDiff version {0}")]
    UnsupportedVersion(u8),

    #[error("delta ended before the EOF command")]
    Truncated,

    #[error("copy of {length} bytes at offset {offset} exceeds original of {source_len} bytes")]
    CopyOutOfRange {
        offset: i64,
        length: i64,
        source_len: usize,
    },

    #[error("negative length in delta")]
    NegativeLength,
}

/// Rebuild the target file from `original` and a GDiff `delta`.
///
/// Anything after the EOF command is ignored.
pub fn patch(original: &[u8], delta: &[u8]) -> Result<Vec<u8>, PatchError> {
    let mut cursor = Cursor { data: delta, pos: 0 };

    if cursor.take(4)? != MAGIC {
        return Err(PatchError::BadMagic);
    }
    let version = cursor.u8()?;
    if version != VERSION {
        return Err(PatchError::UnsupportedVersion(version));
    }

    let mut out = Vec::with_capacity(original.len());
    loop {
        let command = cursor.u8()?;
        match command {
            EOF => break,
            1..=DATA_MAX => out.extend_from_slice(cursor.take(command as usize)?),
            DATA_USHORT => {
                let len = cursor.u16()? as usize;
                out.extend_from_slice(cursor.take(len)?);
            }
            DATA_INT => {
                let len = non_negative(cursor.i32()? as i64)?;
                out.extend_from_slice(cursor.take(len as usize)?);
            }
            COPY_USHORT_UBYTE..=COPY_LONG_INT => {
                let (offset, length) = match command {
                    COPY_USHORT_UBYTE => (cursor.u16()? as i64, cursor.u8()? as i64),
                    COPY_USHORT_USHORT => (cursor.u16()? as i64, cursor.u16()? as i64),
                    COPY_USHORT_INT => (cursor.u16()? as i64, cursor.i32()? as i64),
                    COPY_INT_UBYTE => (cursor.i32()? as i64, cursor.u8()? as i64),
                    COPY_INT_USHORT => (cursor.i32()? as i64, cursor.u16()? as i64),
                    COPY_INT_INT => (cursor.i32()? as i64, cursor.i32()? as i64),
                    _ => (cursor.i64()?, cursor.i32()? as i64),
                };
                out.extend_from_slice(copy_range(original, offset, length)?);
            }
        }
    }

    trace!(
        original = original.len(),
        delta = delta.len(),
        target = out.len(),
        "applied delta"
    );
    Ok(out)
}

fn non_negative(value: i64) -> Result<i64, PatchError> {
    if value < 0 {
        return Err(PatchError::NegativeLength);
    }
    Ok(value)
}

fn copy_range(original: &[u8], offset: i64, length: i64) -> Result<&[u8], PatchError> {
    let length = non_negative(length)?;
    let out_of_range = PatchError::CopyOutOfRange {
        offset,
        length,
        source_len: original.len(),
    };
    let start = usize::try_from(offset).map_err(|_| out_of_range.clone())?;
    let end = start
        .checked_add(length as usize)
        .filter(|end| *end <= original.len())
        .ok_or(out_of_range)?;
    Ok(&original[start..end])
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], PatchError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(PatchError::Truncated)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], PatchError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, PatchError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, PatchError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, PatchError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, PatchError> {
        Ok(i64::from_be_bytes(self.array()?))
    }
}
