//! Box header encoding and big-endian field helpers.

use std::io::{self, Read, Write};

/// A four-character box type such as `moov` or `SA3D`.
pub type FourCc = [u8; 4];

/// Render a box type for log and error messages.
pub fn fourcc_str(name: &FourCc) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// A decoded box header.
///
/// `size` is the raw value from the file: `0` means the box extends to the
/// end of its enclosing space and must be resolved by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    /// Box type.
    pub name: FourCc,
    /// Total box size including the header.
    pub size: u64,
    /// 8, or 16 with a largesize.
    pub header_size: u64,
}

fn read_u32_be<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64_be<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// Read a box header, following a `size == 1` marker to its largesize.
pub fn read_box_header<R: Read>(r: &mut R) -> io::Result<BoxHeader> {
    let size32 = read_u32_be(r)?;
    let mut name = [0u8; 4];
    r.read_exact(&mut name)?;
    let mut size = size32 as u64;
    let mut header_size = 8u64;
    if size32 == 1 {
        size = read_u64_be(r)?;
        header_size = 16;
    }
    Ok(BoxHeader {
        name,
        size,
        header_size,
    })
}

/// Header length needed to frame `payload_len` bytes.
pub fn header_len(payload_len: u64) -> u64 {
    if payload_len + 8 > u32::MAX as u64 {
        16
    } else {
        8
    }
}

/// Write a box header for a payload of `payload_len` bytes, switching to
/// a 64-bit largesize when the box would not fit in 32 bits.
pub fn write_box_header<W: Write>(w: &mut W, name: &FourCc, payload_len: u64) -> io::Result<()> {
    if header_len(payload_len) == 16 {
        w.write_all(&1u32.to_be_bytes())?;
        w.write_all(name)?;
        w.write_all(&(payload_len + 16).to_be_bytes())?;
    } else {
        w.write_all(&((payload_len + 8) as u32).to_be_bytes())?;
        w.write_all(name)?;
    }
    Ok(())
}

/// Big-endian `u16` at `offset`, or `None` past the end of `data`.
pub fn read_u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Big-endian `u32` at `offset`, or `None` past the end of `data`.
pub fn read_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Big-endian `u64` at `offset`, or `None` past the end of `data`.
pub fn read_u64_at(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_compact_header() {
        let bytes = [0, 0, 0, 16, b'f', b'r', b'e', b'e'];
        let header = read_box_header(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(&header.name, b"free");
        assert_eq!(header.size, 16);
        assert_eq!(header.header_size, 8);
    }

    #[test]
    fn reads_largesize_header() {
        let mut bytes = vec![0, 0, 0, 1];
        bytes.extend_from_slice(b"mdat");
        bytes.extend_from_slice(&0x1_0000_0010u64.to_be_bytes());
        let header = read_box_header(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(&header.name, b"mdat");
        assert_eq!(header.size, 0x1_0000_0010);
        assert_eq!(header.header_size, 16);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let bytes = [0, 0, 0];
        assert!(read_box_header(&mut Cursor::new(&bytes)).is_err());
    }

    #[test]
    fn writes_compact_header() {
        let mut out = Vec::new();
        write_box_header(&mut out, b"uuid", 24).unwrap();
        assert_eq!(out, [0, 0, 0, 32, b'u', b'u', b'i', b'd']);
    }

    #[test]
    fn field_readers_bounds_check() {
        let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02];
        assert_eq!(read_u16_at(&data, 0), Some(1));
        assert_eq!(read_u32_at(&data, 2), Some(2));
        assert_eq!(read_u32_at(&data, 3), None);
        assert_eq!(read_u64_at(&data, 0), None);
    }
}
