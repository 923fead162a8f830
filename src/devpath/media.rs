//! Media device path nodes (type 0x04).

use std::fmt;

use binrw::binrw;
use binrw::helpers::until_eof;
use serde::Serialize;

use super::{
    decode_fixed, encode_fixed, hex, RecordKind, Vendor, DEVICE_TYPE_MEDIA,
};
use crate::error::Result;
use crate::guid::{bytes_to_guid, EfiGuid};
use crate::ucs2;

pub const HARD_DRIVE: u8      = 0x01;
pub const CDROM: u8           = 0x02;
pub const VENDOR: u8          = 0x03;
pub const FILE: u8            = 0x04;
pub const PROTOCOL: u8        = 0x05;
pub const FIRMWARE_FILE: u8   = 0x06;
pub const FIRMWARE_VOLUME: u8 = 0x07;
pub const RELATIVE_OFFSET: u8 = 0x08;
pub const RAM_DISK: u8        = 0x09;

pub const SIGNATURE_NONE: u8 = 0;
pub const SIGNATURE_MBR: u8  = 1;
pub const SIGNATURE_GUID: u8 = 2;

pub const PARTITION_FORMAT_MBR: u8 = 1;
pub const PARTITION_FORMAT_GPT: u8 = 2;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardDrive {
    pub partition_number: u32,
    pub partition_start:  u64,
    pub partition_size:   u64,
    pub signature:        [u8; 16],
    pub partition_format: u8,
    pub signature_type:   u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionSignature {
    None,
    Mbr(u32),
    Guid(EfiGuid),
    Unknown(u8),
}

impl HardDrive {
    pub fn signature(&self) -> PartitionSignature {
        match self.signature_type {
            SIGNATURE_NONE => PartitionSignature::None,
            SIGNATURE_MBR => PartitionSignature::Mbr(u32::from_le_bytes([
                self.signature[0],
                self.signature[1],
                self.signature[2],
                self.signature[3],
            ])),
            SIGNATURE_GUID => {
                PartitionSignature::Guid(bytes_to_guid(&self.signature))
            }
            t => PartitionSignature::Unknown(t),
        }
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CdRom {
    pub boot_entry:      u32,
    pub partition_start: u64,
    pub partition_size:  u64,
}

/// Path name, stored as NUL-terminated UCS-2.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePath {
    #[br(parse_with = ucs2::parse_until_eof)]
    #[bw(write_with = ucs2::write_terminated)]
    pub path: String,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Protocol {
    pub guid: EfiGuid,
}

/// PIWG firmware file or volume name. Normally a GUID, but left opaque so
/// that odd lengths survive a round trip.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirmwareName {
    #[br(parse_with = until_eof)]
    pub data: Vec<u8>,
}

impl FirmwareName {
    pub fn name_guid(&self) -> Option<EfiGuid> {
        let raw: &[u8; 16] = self.data.as_slice().try_into().ok()?;
        Some(bytes_to_guid(raw))
    }
}

impl fmt::Display for FirmwareName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name_guid() {
            Some(g) => write!(f, "{}", g),
            None => write!(f, "{}", hex(&self.data)),
        }
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelativeOffset {
    pub reserved:     u32,
    pub first_offset: u64,
    pub last_offset:  u64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RamDisk {
    pub start:     u64,
    pub end:       u64,
    pub disk_type: EfiGuid,
    pub instance:  u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MediaRecord {
    HardDrive(HardDrive),
    CdRom(CdRom),
    Vendor(Vendor),
    File(FilePath),
    Protocol(Protocol),
    FirmwareFile(FirmwareName),
    FirmwareVolume(FirmwareName),
    RelativeOffset(RelativeOffset),
    RamDisk(RamDisk),
}

impl MediaRecord {
    pub fn subtype(&self) -> u8 {
        match self {
            MediaRecord::HardDrive(_) => HARD_DRIVE,
            MediaRecord::CdRom(_) => CDROM,
            MediaRecord::Vendor(_) => VENDOR,
            MediaRecord::File(_) => FILE,
            MediaRecord::Protocol(_) => PROTOCOL,
            MediaRecord::FirmwareFile(_) => FIRMWARE_FILE,
            MediaRecord::FirmwareVolume(_) => FIRMWARE_VOLUME,
            MediaRecord::RelativeOffset(_) => RELATIVE_OFFSET,
            MediaRecord::RamDisk(_) => RAM_DISK,
        }
    }

    pub(crate) fn decode(kind: &RecordKind, payload: &[u8]) -> Result<Self> {
        kind.expect_type(DEVICE_TYPE_MEDIA)?;
        Ok(match kind.subtype {
            HARD_DRIVE => MediaRecord::HardDrive(decode_fixed(payload)?),
            CDROM => MediaRecord::CdRom(decode_fixed(payload)?),
            VENDOR => MediaRecord::Vendor(decode_fixed(payload)?),
            FILE => MediaRecord::File(decode_fixed(payload)?),
            PROTOCOL => MediaRecord::Protocol(decode_fixed(payload)?),
            FIRMWARE_FILE => MediaRecord::FirmwareFile(decode_fixed(payload)?),
            FIRMWARE_VOLUME =>
                MediaRecord::FirmwareVolume(decode_fixed(payload)?),
            RELATIVE_OFFSET =>
                MediaRecord::RelativeOffset(decode_fixed(payload)?),
            RAM_DISK => MediaRecord::RamDisk(decode_fixed(payload)?),
            _ => return Err(kind.unsupported()),
        })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            MediaRecord::HardDrive(v) => encode_fixed(v, out),
            MediaRecord::CdRom(v) => encode_fixed(v, out),
            MediaRecord::Vendor(v) => encode_fixed(v, out),
            MediaRecord::File(v) => encode_fixed(v, out),
            MediaRecord::Protocol(v) => encode_fixed(v, out),
            MediaRecord::FirmwareFile(v) => encode_fixed(v, out),
            MediaRecord::FirmwareVolume(v) => encode_fixed(v, out),
            MediaRecord::RelativeOffset(v) => encode_fixed(v, out),
            MediaRecord::RamDisk(v) => encode_fixed(v, out),
        }
    }
}

impl fmt::Display for MediaRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MediaRecord::HardDrive(hd) => {
                write!(f, "HD({},", hd.partition_number)?;
                match hd.signature() {
                    PartitionSignature::None => write!(f, "None,0")?,
                    PartitionSignature::Mbr(sig) =>
                        write!(f, "MBR,{:#010x}", sig)?,
                    PartitionSignature::Guid(g) => write!(f, "GPT,{}", g)?,
                    PartitionSignature::Unknown(t) =>
                        write!(f, "{},{}", t, hex(&hd.signature))?,
                }
                write!(f, ",{:#x},{:#x})", hd.partition_start, hd.partition_size)
            }
            MediaRecord::CdRom(c) => write!(f, "CDROM({:#x},{:#x},{:#x})",
                c.boot_entry, c.partition_start, c.partition_size),
            MediaRecord::Vendor(v) => v.fmt_as(f, "VenMedia"),
            MediaRecord::File(p) => write!(f, "{}", p.path),
            MediaRecord::Protocol(p) => write!(f, "Media({})", p.guid),
            MediaRecord::FirmwareFile(n) => write!(f, "FvFile({})", n),
            MediaRecord::FirmwareVolume(n) => write!(f, "Fv({})", n),
            MediaRecord::RelativeOffset(o) => write!(f, "Offset({:#x},{:#x})",
                o.first_offset, o.last_offset),
            MediaRecord::RamDisk(r) => write!(f, "RamDisk({:#x},{:#x},{},{})",
                r.start, r.end, r.instance, r.disk_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devpath::{decode_record, encode_record, DevicePathRecord};
    use crate::guid::guid_to_bytes;

    const ESP: &str = "c12a7328-f81f-11d2-ba4b-00a0c93ec93b";

    fn round_trip(r: MediaRecord) -> Vec<u8> {
        let rec = DevicePathRecord::Media(r);
        let raw = encode_record(&rec).unwrap();
        assert_eq!(raw[0], DEVICE_TYPE_MEDIA);
        assert_eq!(u16::from_le_bytes([raw[2], raw[3]]) as usize, raw.len());
        assert_eq!(DevicePathRecord::parse(&raw).unwrap(), rec);
        raw
    }

    fn gpt_partition() -> HardDrive {
        let guid: EfiGuid = ESP.parse().unwrap();
        HardDrive {
            partition_number: 1,
            partition_start:  0x800,
            partition_size:   0x10_0000,
            signature:        guid_to_bytes(&guid),
            partition_format: PARTITION_FORMAT_GPT,
            signature_type:   SIGNATURE_GUID,
        }
    }

    #[test]
    fn hard_drive_gpt() {
        let hd = gpt_partition();
        assert_eq!(hd.signature(),
            PartitionSignature::Guid(ESP.parse().unwrap()));
        let r = MediaRecord::HardDrive(hd);
        assert_eq!(r.to_string(), format!("HD(1,GPT,{},0x800,0x100000)", ESP));
        assert_eq!(round_trip(r).len(), 42);
    }

    #[test]
    fn hard_drive_mbr() {
        let mut signature = [0u8; 16];
        signature[..4].copy_from_slice(&0x1234_abcdu32.to_le_bytes());
        let hd = HardDrive {
            partition_number: 2,
            partition_start:  63,
            partition_size:   2048,
            signature,
            partition_format: PARTITION_FORMAT_MBR,
            signature_type:   SIGNATURE_MBR,
        };
        assert_eq!(hd.signature(), PartitionSignature::Mbr(0x1234_abcd));
        assert_eq!(MediaRecord::HardDrive(hd).to_string(),
            "HD(2,MBR,0x1234abcd,0x3f,0x800)");
    }

    #[test]
    fn file_path() {
        let path = "\\EFI\\BOOT\\BOOTX64.EFI";
        let raw = round_trip(MediaRecord::File(FilePath {
            path: path.to_string(),
        }));
        assert_eq!(&raw[raw.len() - 2..], &[0, 0]);
        assert_eq!(DevicePathRecord::parse(&raw).unwrap().file_path(),
            Some(path));

        // header-only file node is an empty path
        let r = decode_record(DEVICE_TYPE_MEDIA, FILE, &[]).unwrap();
        assert_eq!(r.file_path(), Some(""));
    }

    #[test]
    fn firmware_names() {
        let guid: EfiGuid = "7c04a583-9e3e-4f1c-ad65-e05268d0b4d1"
            .parse().unwrap();
        let name = FirmwareName { data: guid_to_bytes(&guid).to_vec() };
        assert_eq!(name.name_guid(), Some(guid));
        let raw = round_trip(MediaRecord::FirmwareFile(name.clone()));
        assert_eq!(raw.len(), 20);
        assert_eq!(MediaRecord::FirmwareFile(name).to_string(),
            "FvFile(7c04a583-9e3e-4f1c-ad65-e05268d0b4d1)");

        let short = FirmwareName { data: vec![1, 2, 3] };
        assert_eq!(short.name_guid(), None);
        round_trip(MediaRecord::FirmwareVolume(short));
    }

    #[test]
    fn fixed_layouts() {
        let raw = round_trip(MediaRecord::CdRom(CdRom {
            boot_entry:      0,
            partition_start: 0x10,
            partition_size:  0x2000,
        }));
        assert_eq!(raw.len(), 24);

        let raw = round_trip(MediaRecord::RelativeOffset(RelativeOffset {
            reserved:     0,
            first_offset: 0x1000,
            last_offset:  0x1fff,
        }));
        assert_eq!(raw.len(), 24);

        let raw = round_trip(MediaRecord::RamDisk(RamDisk {
            start:     0x8000_0000,
            end:       0x8fff_ffff,
            disk_type: ESP.parse().unwrap(),
            instance:  0,
        }));
        assert_eq!(raw.len(), 38);

        let raw = round_trip(MediaRecord::Protocol(Protocol {
            guid: ESP.parse().unwrap(),
        }));
        assert_eq!(raw.len(), 20);
    }

    #[test]
    fn vendor_keeps_trailing_bytes() {
        let guid: EfiGuid = "2d6447ef-3bc9-41a0-ac19-4d51d01b4ce6"
            .parse().unwrap();
        let r = MediaRecord::Vendor(Vendor {
            guid,
            data: vec![0x01, 0x02, 0x03],
        });
        let raw = round_trip(r.clone());
        assert_eq!(raw.len(), 4 + 16 + 3);
        assert_eq!(raw[1], VENDOR);
        assert_eq!(r.to_string(),
            "VenMedia(2d6447ef-3bc9-41a0-ac19-4d51d01b4ce6,010203)");

        let bare = decode_record(DEVICE_TYPE_MEDIA, VENDOR, &raw[4..20])
            .unwrap();
        assert_eq!(bare, DevicePathRecord::Media(MediaRecord::Vendor(
            Vendor { guid, data: Vec::new() })));
        assert_eq!(MediaRecord::Vendor(Vendor { guid, data: Vec::new() })
            .to_string(), "VenMedia(2d6447ef-3bc9-41a0-ac19-4d51d01b4ce6)");
    }

    #[test]
    fn short_hard_drive_is_truncated() {
        let hd = encode_record(&DevicePathRecord::Media(
            MediaRecord::HardDrive(gpt_partition()))).unwrap();
        assert!(decode_record(DEVICE_TYPE_MEDIA, HARD_DRIVE, &hd[4..30])
            .is_err());
    }
}
