//! ACPI device path nodes (type 0x02).

use std::fmt;

use binrw::binrw;
use binrw::helpers::until_eof;
use serde::Serialize;

use super::{decode_fixed, encode_fixed, RecordKind, DEVICE_TYPE_ACPI};
use crate::error::Result;
use crate::primitive::{push_cstr, split_cstr, write_u32le, ByteCursor};

pub const HID: u8   = 0x01;
pub const HIDEX: u8 = 0x02;
pub const ADR: u8   = 0x03;

const PNP_EISA_MASK: u32 = 0xffff;
const PNP_EISA_VENDOR: u32 = 0x41d0;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hid {
    pub hid: u32,
    pub uid: u32,
}

/// Expanded ACPI node: numeric ids followed by the HID, UID and CID
/// strings, each NUL-terminated ASCII.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HidEx {
    pub hid:     u32,
    pub uid:     u32,
    pub cid:     u32,
    pub hid_str: String,
    pub uid_str: String,
    pub cid_str: String,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Adr {
    #[br(parse_with = until_eof)]
    pub addresses: Vec<u32>,
}

impl HidEx {
    fn decode(payload: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(payload);
        let mut ex = HidEx {
            hid: c.read_u32()?,
            uid: c.read_u32()?,
            cid: c.read_u32()?,
            ..Default::default()
        };

        // The strings are optional in practice. Anything we cannot split
        // into three terminated strings is treated as three empty ones.
        let rest = c.rest();
        if rest.is_empty() {
            return Ok(ex);
        }
        let strings = split_cstr(rest).and_then(|(h, rest)| {
            let (u, rest) = split_cstr(rest)?;
            let (c, rest) = split_cstr(rest)?;
            Some((h, u, c, rest))
        });
        match strings {
            Some((h, u, c, tail)) => {
                if !tail.is_empty() {
                    log::debug!("AcpiEx: ignoring {} trailing bytes", tail.len());
                }
                ex.hid_str = String::from_utf8_lossy(h).into_owned();
                ex.uid_str = String::from_utf8_lossy(u).into_owned();
                ex.cid_str = String::from_utf8_lossy(c).into_owned();
            }
            None => log::debug!("AcpiEx: unterminated id strings ignored"),
        }
        Ok(ex)
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&write_u32le(self.hid));
        out.extend_from_slice(&write_u32le(self.uid));
        out.extend_from_slice(&write_u32le(self.cid));
        push_cstr(out, &self.hid_str, "AcpiEx HID string")?;
        push_cstr(out, &self.uid_str, "AcpiEx UID string")?;
        push_cstr(out, &self.cid_str, "AcpiEx CID string")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AcpiRecord {
    Hid(Hid),
    HidEx(HidEx),
    Adr(Adr),
}

impl AcpiRecord {
    pub fn subtype(&self) -> u8 {
        match self {
            AcpiRecord::Hid(_) => HID,
            AcpiRecord::HidEx(_) => HIDEX,
            AcpiRecord::Adr(_) => ADR,
        }
    }

    pub(crate) fn decode(kind: &RecordKind, payload: &[u8]) -> Result<Self> {
        kind.expect_type(DEVICE_TYPE_ACPI)?;
        Ok(match kind.subtype {
            HID => AcpiRecord::Hid(decode_fixed(payload)?),
            HIDEX => AcpiRecord::HidEx(HidEx::decode(payload)?),
            ADR => AcpiRecord::Adr(decode_fixed(payload)?),
            _ => return Err(kind.unsupported()),
        })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            AcpiRecord::Hid(v) => encode_fixed(v, out),
            AcpiRecord::HidEx(v) => v.encode(out),
            AcpiRecord::Adr(v) => encode_fixed(v, out),
        }
    }
}

/// Compressed EISA ids print as `PNPxxxx`, anything else as hex.
pub fn eisa_id(id: u32) -> String {
    if id & PNP_EISA_MASK == PNP_EISA_VENDOR {
        format!("PNP{:04X}", id >> 16)
    } else {
        format!("{:#x}", id)
    }
}

impl fmt::Display for AcpiRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AcpiRecord::Hid(h) => match eisa_id(h.hid).as_str() {
                "PNP0A03" => write!(f, "PciRoot({:#x})", h.uid),
                "PNP0A08" => write!(f, "PcieRoot({:#x})", h.uid),
                "PNP0501" => write!(f, "Serial({:#x})", h.uid),
                "PNP0604" => write!(f, "Floppy({:#x})", h.uid),
                id => write!(f, "Acpi({},{:#x})", id, h.uid),
            },
            AcpiRecord::HidEx(e) => write!(f, "AcpiEx({},{},{:#x},{},{},{})",
                eisa_id(e.hid), eisa_id(e.cid), e.uid,
                e.hid_str, e.cid_str, e.uid_str),
            AcpiRecord::Adr(a) => {
                write!(f, "AcpiAdr(")?;
                for (i, adr) in a.addresses.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{:#x}", adr)?;
                }
                write!(f, ")")
            }
        }
    }
}
