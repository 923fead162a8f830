//! Legacy BIOS boot specification node (type 0x05).

use std::fmt;

use serde::Serialize;

use super::{RecordKind, DEVICE_TYPE_BIOS_BOOT};
use crate::error::Result;
use crate::primitive::{push_cstr, split_cstr, write_u16le, ByteCursor};

pub const BBS: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BiosBoot {
    /// BBS device class: 1 floppy, 2 hard disk, 3 CD-ROM, 5 USB, 6 network.
    pub device_type: u16,
    pub status:      u16,
    pub description: String,
}

impl BiosBoot {
    pub(crate) fn decode(kind: &RecordKind, payload: &[u8]) -> Result<Self> {
        kind.expect_type(DEVICE_TYPE_BIOS_BOOT)?;
        if kind.subtype != BBS {
            return Err(kind.unsupported());
        }

        let mut c = ByteCursor::new(payload);
        let mut bbs = BiosBoot {
            device_type: c.read_u16()?,
            status:      c.read_u16()?,
            ..Default::default()
        };
        let rest = c.rest();
        match split_cstr(rest) {
            Some((desc, _)) => {
                bbs.description = String::from_utf8_lossy(desc).into_owned();
            }
            None if rest.is_empty() => {}
            None => log::debug!("BBS: unterminated description ignored"),
        }
        Ok(bbs)
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&write_u16le(self.device_type));
        out.extend_from_slice(&write_u16le(self.status));
        push_cstr(out, &self.description, "BBS description")
    }
}

impl fmt::Display for BiosBoot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let class = match self.device_type {
            1 => "Floppy",
            2 => "HD",
            3 => "CDROM",
            4 => "PCMCIA",
            5 => "USB",
            6 => "Network",
            _ => "",
        };
        if class.is_empty() {
            write!(f, "BBS({:#x},{},{:#x})",
                self.device_type, self.description, self.status)
        } else {
            write!(f, "BBS({},{},{:#x})", class, self.description, self.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devpath::{encode_record, DevicePathRecord};
    use crate::error::Error;

    #[test]
    fn description_round_trip() {
        let rec = DevicePathRecord::BiosBoot(BiosBoot {
            device_type: 2,
            status:      0x100,
            description: "SATA0".to_string(),
        });
        let raw = encode_record(&rec).unwrap();
        assert_eq!(raw, [0x05, 0x01, 0x0e, 0x00, 0x02, 0x00, 0x00, 0x01,
            b'S', b'A', b'T', b'A', b'0', 0x00]);
        assert_eq!(DevicePathRecord::parse(&raw).unwrap(), rec);
        assert_eq!(rec.to_string(), "BBS(HD,SATA0,0x100)");
    }

    #[test]
    fn missing_or_broken_description() {
        let bare = [0x05, 0x01, 0x08, 0x00, 0x06, 0x00, 0x00, 0x00];
        match DevicePathRecord::parse(&bare).unwrap() {
            DevicePathRecord::BiosBoot(b) => {
                assert_eq!(b.device_type, 6);
                assert!(b.description.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }

        let broken = [0x05, 0x01, 0x0a, 0x00, 0x03, 0x00, 0x00, 0x00, b'c', b'd'];
        match DevicePathRecord::parse(&broken).unwrap() {
            DevicePathRecord::BiosBoot(b) => assert!(b.description.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn description_with_null_is_refused() {
        let rec = DevicePathRecord::BiosBoot(BiosBoot {
            device_type: 2,
            status:      0,
            description: "SATA\00".to_string(),
        });
        assert!(matches!(encode_record(&rec),
            Err(Error::InteriorNul("BBS description"))));
    }

    #[test]
    fn short_payload() {
        assert!(DevicePathRecord::parse(&[0x05, 0x01, 0x06, 0x00, 0x02, 0x00])
            .is_err());
    }
}
