//! UCS-2 text as used by load option descriptions, file path nodes and
//! variable names.
//!
//! Firmware treats these strings as arrays of 16-bit code units. Units are
//! decoded one at a time with no surrogate pairing, and encoding truncates
//! every scalar to 16 bits.

use std::char::REPLACEMENT_CHARACTER;

use binrw::io::{ErrorKind, Read, Write};
use binrw::BinResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ucs2Text {
    pub text:       String,
    /// Bytes of code units read, not counting a terminator.
    pub len:        usize,
    /// A zero code unit was found before the limit.
    pub terminated: bool,
}

/// Decode little-endian code units from `buf[offset..]`, stopping at the
/// first zero unit or after `limit` bytes, whichever comes first. A trailing
/// odd byte is ignored.
pub fn decode_ucs2(buf: &[u8], offset: usize, limit: usize) -> Ucs2Text {
    let region = buf.get(offset..).unwrap_or_default();
    let region = &region[..limit.min(region.len())];

    let mut text = String::with_capacity(region.len() / 2);
    let mut len = 0;
    let mut terminated = false;
    for unit in region.chunks_exact(2) {
        let ch = u16::from_le_bytes([unit[0], unit[1]]);
        if ch == 0 {
            terminated = true;
            break;
        }
        text.push(char::from_u32(ch as u32).unwrap_or(REPLACEMENT_CHARACTER));
        len += 2;
    }

    Ucs2Text { text, len, terminated }
}

/// Encode `s` as UCS-2LE, appending a null code unit when `terminate` is
/// set.
pub fn encode_ucs2(s: &str, terminate: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity((s.len() + 1) * 2);
    for ch in s.chars() {
        let cp = ch as u32;
        if cp > 0xffff {
            log::debug!("truncating U+{:X} to 16 bits", cp);
        }
        out.extend_from_slice(&(cp as u16).to_le_bytes());
    }
    if terminate {
        out.extend_from_slice(&[0, 0]);
    }
    out
}

/// binrw parser for a string that runs to the end of the record payload.
#[binrw::parser(reader)]
pub fn parse_until_eof() -> BinResult<String> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    Ok(decode_ucs2(&raw, 0, raw.len()).text)
}

/// binrw parser for a string stored in a field of `len` bytes. Only the
/// bytes actually present are buffered, so a bogus `len` fails as EOF.
#[binrw::parser(reader)]
pub fn parse_sized(len: u32) -> BinResult<String> {
    let mut raw = Vec::new();
    reader.take(u64::from(len)).read_to_end(&mut raw)?;
    if raw.len() < len as usize {
        return Err(binrw::Error::Io(ErrorKind::UnexpectedEof.into()));
    }
    Ok(decode_ucs2(&raw, 0, raw.len()).text)
}

#[binrw::writer(writer)]
pub fn write_terminated(s: &String) -> BinResult<()> {
    writer.write_all(&encode_ucs2(s, true))?;
    Ok(())
}

#[binrw::writer(writer)]
pub fn write_unterminated(s: &String) -> BinResult<()> {
    writer.write_all(&encode_ucs2(s, false))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::io::Cursor;
    use binrw::Endian;

    #[test]
    fn decode_stops_at_null() {
        let buf = [b'L', 0, b'i', 0, 0, 0, b'x', 0];
        let t = decode_ucs2(&buf, 0, buf.len());
        assert_eq!(t.text, "Li");
        assert_eq!(t.len, 4);
        assert!(t.terminated);
    }

    #[test]
    fn decode_stops_at_limit() {
        let buf = [b'a', 0, b'b', 0, b'c', 0];
        let t = decode_ucs2(&buf, 2, 2);
        assert_eq!(t.text, "b");
        assert!(!t.terminated);

        // odd trailing byte is not a code unit
        let t = decode_ucs2(&buf, 0, 5);
        assert_eq!(t.text, "ab");
        assert_eq!(t.len, 4);

        let t = decode_ucs2(&buf, 10, 4);
        assert_eq!(t.text, "");
        assert!(!t.terminated);
    }

    #[test]
    fn decode_does_not_pair_surrogates() {
        // U+1F600 as a surrogate pair
        let buf = [0x3d, 0xd8, 0x00, 0xde];
        let t = decode_ucs2(&buf, 0, buf.len());
        assert_eq!(t.text, "\u{fffd}\u{fffd}");
    }

    #[test]
    fn sized_field() {
        let mut c = Cursor::new(&b"a\0b\0c\0"[..]);
        assert_eq!(parse_sized(&mut c, Endian::Little, (4,)).unwrap(), "ab");
        assert_eq!(c.position(), 4);

        let mut c = Cursor::new(&b"a\0"[..]);
        let err = parse_sized(&mut c, Endian::Little, (0xffff_fff0,))
            .unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn encode_bmp() {
        assert_eq!(encode_ucs2("A\u{e9}\u{20ac}", false),
            vec![0x41, 0x00, 0xe9, 0x00, 0xac, 0x20]);
        assert_eq!(encode_ucs2("", true), vec![0, 0]);
        assert_eq!(encode_ucs2("x", true), vec![b'x', 0, 0, 0]);
    }

    #[test]
    fn encode_truncates_astral() {
        // U+1F600 truncates to 0xF600
        assert_eq!(encode_ucs2("\u{1f600}", false), vec![0x00, 0xf6]);
    }

    #[test]
    fn text_survives_encode_decode() {
        let s = "\\EFI\\BOOT\\BOOTX64.EFI";
        let raw = encode_ucs2(s, true);
        let t = decode_ucs2(&raw, 0, raw.len());
        assert_eq!(t.text, s);
        assert_eq!(t.len, raw.len() - 2);
        assert!(t.terminated);
    }
}
