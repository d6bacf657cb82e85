//! Bounds-checked big-endian primitives.
//!
//! The free functions read from a slice at a slice-relative offset. [`Reader`]
//! is a cursor over one box body built on top of them; it reports errors with
//! absolute buffer offsets.

use crate::boxes::FourCC;
use crate::error::ReadError;
use byteorder::{BigEndian, ByteOrder};

fn take(buf: &[u8], offset: usize, n: usize) -> Result<&[u8], ReadError> {
    let available = buf.len().saturating_sub(offset);
    if n > available {
        return Err(ReadError::OutOfBounds {
            offset: offset as u64,
            needed: n,
            available,
        });
    }
    Ok(&buf[offset..offset + n])
}

pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8, ReadError> {
    Ok(take(buf, offset, 1)?[0])
}

pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ReadError> {
    take(buf, offset, 2).map(BigEndian::read_u16)
}

pub fn read_i16(buf: &[u8], offset: usize) -> Result<i16, ReadError> {
    take(buf, offset, 2).map(BigEndian::read_i16)
}

pub fn read_u24(buf: &[u8], offset: usize) -> Result<u32, ReadError> {
    take(buf, offset, 3).map(BigEndian::read_u24)
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ReadError> {
    take(buf, offset, 4).map(BigEndian::read_u32)
}

pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32, ReadError> {
    take(buf, offset, 4).map(BigEndian::read_i32)
}

pub fn read_u48(buf: &[u8], offset: usize) -> Result<u64, ReadError> {
    take(buf, offset, 6).map(BigEndian::read_u48)
}

pub fn read_u64(buf: &[u8], offset: usize) -> Result<u64, ReadError> {
    take(buf, offset, 8).map(BigEndian::read_u64)
}

pub fn read_i64(buf: &[u8], offset: usize) -> Result<i64, ReadError> {
    take(buf, offset, 8).map(BigEndian::read_i64)
}

/// MPEG-4 descriptor length: 7 bits per byte, high bit set on every byte but
/// the last. Returns the value and the offset just past it.
pub fn descriptor_length(buf: &[u8], offset: usize) -> Result<(u32, usize), ReadError> {
    let mut len = 0u32;
    let mut pos = offset;
    // sizeOfInstance is at most 4 bytes
    for _ in 0..4 {
        let b = read_u8(buf, pos)?;
        pos += 1;
        len = (len << 7) | u32::from(b & 0x7f);
        if b & 0x80 == 0 {
            return Ok((len, pos));
        }
    }
    Err(ReadError::DescriptorLength {
        offset: offset as u64,
    })
}

/// Length of the zero-terminated string at `offset`, terminator included.
/// Returns `max_len` (clamped to the bytes available) when no terminator is
/// found within it.
pub fn zero_terminated_len(buf: &[u8], offset: usize, max_len: usize) -> usize {
    let max_len = max_len.min(buf.len().saturating_sub(offset));
    buf[offset.min(buf.len())..]
        .iter()
        .take(max_len)
        .position(|&b| b == 0)
        .map_or(max_len, |p| p + 1)
}

/// Cursor over one box body.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> Reader<'a> {
    /// `base` is the absolute offset of `buf[0]` in the decoded buffer.
    pub fn new(buf: &'a [u8], base: u64) -> Self {
        Self { buf, pos: 0, base }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Absolute offset of the cursor.
    pub fn absolute(&self) -> u64 {
        self.base + self.pos as u64
    }

    fn advance<T>(&mut self, n: usize, r: Result<T, ReadError>) -> Result<T, ReadError> {
        let v = r.map_err(|e| e.rebase(self.base))?;
        self.pos += n;
        Ok(v)
    }

    pub fn u8(&mut self) -> Result<u8, ReadError> {
        let r = read_u8(self.buf, self.pos);
        self.advance(1, r)
    }

    pub fn u16(&mut self) -> Result<u16, ReadError> {
        let r = read_u16(self.buf, self.pos);
        self.advance(2, r)
    }

    pub fn i16(&mut self) -> Result<i16, ReadError> {
        let r = read_i16(self.buf, self.pos);
        self.advance(2, r)
    }

    pub fn u24(&mut self) -> Result<u32, ReadError> {
        let r = read_u24(self.buf, self.pos);
        self.advance(3, r)
    }

    pub fn u32(&mut self) -> Result<u32, ReadError> {
        let r = read_u32(self.buf, self.pos);
        self.advance(4, r)
    }

    pub fn i32(&mut self) -> Result<i32, ReadError> {
        let r = read_i32(self.buf, self.pos);
        self.advance(4, r)
    }

    pub fn u48(&mut self) -> Result<u64, ReadError> {
        let r = read_u48(self.buf, self.pos);
        self.advance(6, r)
    }

    pub fn u64(&mut self) -> Result<u64, ReadError> {
        let r = read_u64(self.buf, self.pos);
        self.advance(8, r)
    }

    pub fn i64(&mut self) -> Result<i64, ReadError> {
        let r = read_i64(self.buf, self.pos);
        self.advance(8, r)
    }

    /// 32-bit when `wide` is false, 64-bit otherwise.
    pub fn u32_or_u64(&mut self, wide: bool) -> Result<u64, ReadError> {
        if wide {
            self.u64()
        } else {
            self.u32().map(u64::from)
        }
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let r = take(self.buf, self.pos, n);
        self.advance(n, r)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        self.bytes(n).map(|_| ())
    }

    pub fn fourcc(&mut self) -> Result<FourCC, ReadError> {
        let b = self.bytes(4)?;
        Ok(FourCC([b[0], b[1], b[2], b[3]]))
    }

    /// Hex rendering of the next `n` bytes, without prefix.
    pub fn hex(&mut self, n: usize) -> Result<String, ReadError> {
        self.bytes(n).map(hex::encode)
    }

    pub fn descriptor_length(&mut self) -> Result<u32, ReadError> {
        let (len, next) =
            descriptor_length(self.buf, self.pos).map_err(|e| e.rebase(self.base))?;
        self.pos = next;
        Ok(len)
    }

    /// Zero-terminated string running at most to the end of the body. The
    /// terminator is consumed but not returned.
    pub fn cstring(&mut self) -> Result<String, ReadError> {
        let len = zero_terminated_len(self.buf, self.pos, self.remaining());
        let raw = self.bytes(len)?;
        let text = raw.strip_suffix(&[0]).unwrap_or(raw);
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    /// Everything left in the body, as lossy text with trailing NULs removed.
    pub fn rest_as_text(&mut self) -> Result<String, ReadError> {
        let mut raw = self.bytes(self.remaining())?;
        while let Some(stripped) = raw.strip_suffix(&[0]) {
            raw = stripped;
        }
        Ok(String::from_utf8_lossy(raw).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_reads_are_big_endian() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_u16(&buf, 0), Ok(0x0102));
        assert_eq!(read_u24(&buf, 1), Ok(0x020304));
        assert_eq!(read_u32(&buf, 4), Ok(0x05060708));
        assert_eq!(read_u48(&buf, 0), Ok(0x010203040506));
        assert_eq!(read_u64(&buf, 0), Ok(0x0102030405060708));
    }

    #[test]
    fn values_beyond_float_precision_are_exact() {
        let buf = [0xff; 8];
        assert_eq!(read_u64(&buf, 0), Ok(u64::MAX));
        assert_eq!(read_i64(&buf, 0), Ok(-1));
        assert_eq!(read_u48(&buf, 2), Ok(0xffff_ffff_ffff));
    }

    #[test]
    fn reads_past_the_end_fail() {
        let buf = [0u8; 3];
        assert_eq!(
            read_u32(&buf, 0),
            Err(ReadError::OutOfBounds {
                offset: 0,
                needed: 4,
                available: 3
            })
        );
        assert!(read_u8(&buf, 3).is_err());
        assert!(read_u8(&buf, 100).is_err());
    }

    #[test]
    fn descriptor_length_single_and_multi_byte() {
        assert_eq!(descriptor_length(&[0x22], 0), Ok((0x22, 1)));
        assert_eq!(descriptor_length(&[0x80, 0x80, 0x80, 0x22], 0), Ok((0x22, 4)));
        assert_eq!(descriptor_length(&[0x81, 0x01], 0), Ok((129, 2)));
        assert!(descriptor_length(&[0x80, 0x80], 0).is_err());
        assert!(descriptor_length(&[0x80; 5], 0).is_err());
    }

    #[test]
    fn zero_terminated_len_includes_terminator() {
        let buf = b"abc\0def";
        assert_eq!(zero_terminated_len(buf, 0, 7), 4);
        assert_eq!(zero_terminated_len(buf, 4, 3), 3);
        assert_eq!(zero_terminated_len(buf, 4, 50), 3);
    }

    #[test]
    fn cursor_reports_absolute_offsets() {
        let mut r = Reader::new(&[0, 1], 100);
        assert_eq!(r.u16(), Ok(1));
        assert_eq!(
            r.u8(),
            Err(ReadError::OutOfBounds {
                offset: 102,
                needed: 1,
                available: 0
            })
        );
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn cstring_without_terminator_keeps_all_bytes() {
        let mut r = Reader::new(b"urn\0tail", 0);
        assert_eq!(r.cstring().as_deref(), Ok("urn"));
        assert_eq!(r.cstring().as_deref(), Ok("tail"));
        assert_eq!(r.remaining(), 0);
        assert_eq!(r.cstring().as_deref(), Ok(""));
    }
}
