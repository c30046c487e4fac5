//! Big-endian cursor helpers used by the parser and the attribute walkers.

use crate::error::{ClassFileError, Result};

/// Forward-only reader over a borrowed byte slice.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassFileError::UnexpectedEof {
                offset: self.pos,
                wanted: len,
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }
}

/// Read a big-endian u16 at `pos` of a mutable attribute buffer.
pub(crate) fn read_u16_at(buf: &[u8], pos: usize) -> Result<u16> {
    match buf.get(pos..pos + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(ClassFileError::UnexpectedEof {
            offset: pos,
            wanted: 2,
        }),
    }
}

pub(crate) fn read_u8_at(buf: &[u8], pos: usize) -> Result<u8> {
    buf.get(pos).copied().ok_or(ClassFileError::UnexpectedEof {
        offset: pos,
        wanted: 1,
    })
}

pub(crate) fn read_u32_at(buf: &[u8], pos: usize) -> Result<u32> {
    match buf.get(pos..pos + 4) {
        Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(ClassFileError::UnexpectedEof {
            offset: pos,
            wanted: 4,
        }),
    }
}

pub(crate) fn write_u16_at(buf: &mut [u8], pos: usize, value: u16) -> Result<()> {
    match buf.get_mut(pos..pos + 2) {
        Some(slot) => {
            slot.copy_from_slice(&value.to_be_bytes());
            Ok(())
        }
        None => Err(ClassFileError::UnexpectedEof {
            offset: pos,
            wanted: 2,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_reads_big_endian() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0x07];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u32().unwrap(), 0xCAFEBABE);
        assert_eq!(reader.u16().unwrap(), 52);
        assert_eq!(reader.u8().unwrap(), 7);
        assert!(reader.u8().is_err());
    }

    #[test]
    fn test_reader_reports_eof() {
        let mut reader = ByteReader::new(&[0x01]);
        assert_eq!(
            reader.u16(),
            Err(ClassFileError::UnexpectedEof {
                offset: 0,
                wanted: 2
            })
        );
    }

    #[test]
    fn test_patch_in_place() {
        let mut buf = vec![0u8; 4];
        write_u16_at(&mut buf, 2, 0x1234).unwrap();
        assert_eq!(read_u16_at(&buf, 2).unwrap(), 0x1234);
        assert!(write_u16_at(&mut buf, 3, 1).is_err());
    }
}
