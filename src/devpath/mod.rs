//! EFI device path records.
//!
//! A device path is a sequence of variable length nodes, each starting with
//! a four byte header (type, subtype, little-endian length) that counts
//! itself. See section 10 of the UEFI specification.

use std::collections::HashMap;
use std::fmt;

use binrw::helpers::until_eof;
use binrw::io::Cursor;
use binrw::{binrw, BinRead, BinWrite, Endian};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::guid::EfiGuid;
use crate::primitive::{write_u16le, ByteCursor};

pub mod acpi;
pub mod bios;
pub mod hardware;
pub mod list;
pub mod media;
pub mod message;

pub use acpi::AcpiRecord;
pub use bios::BiosBoot;
pub use hardware::HardwareRecord;
pub use list::{
    count_records, find_file_path, format_list, parse_list, record_length,
    split_instances, total_size, walk_list, ListWalk,
};
pub use media::MediaRecord;
pub use message::MessageRecord;

pub const HEADER_LEN: usize = 4;

pub const DEVICE_TYPE_HARDWARE: u8  = 0x01;
pub const DEVICE_TYPE_ACPI: u8      = 0x02;
pub const DEVICE_TYPE_MESSAGE: u8   = 0x03;
pub const DEVICE_TYPE_MEDIA: u8     = 0x04;
pub const DEVICE_TYPE_BIOS_BOOT: u8 = 0x05;
pub const DEVICE_TYPE_END: u8       = 0x7f;

pub const END_INSTANCE: u8 = 0x01;
pub const END_ENTIRE: u8   = 0xff;

/// The canonical end-of-entire-list record.
pub const END_ENTIRE_RECORD: [u8; 4] = [DEVICE_TYPE_END, END_ENTIRE, 4, 0];

pub type DevicePathList = Vec<DevicePathRecord>;

/// One recognised (type, subtype) pair.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordKind {
    pub device_type: u8,
    pub subtype:     u8,
    pub name:        &'static str,
    /// Smallest payload (bytes after the header) the layout allows.
    pub min_payload: usize,
}

impl RecordKind {
    pub(crate) fn unsupported(&self) -> Error {
        Error::UnsupportedRecord {
            device_type: self.device_type,
            subtype:     self.subtype,
        }
    }

    pub(crate) fn expect_type(&self, device_type: u8) -> Result<()> {
        if self.device_type == device_type {
            Ok(())
        } else {
            Err(self.unsupported())
        }
    }
}

macro_rules! kinds {
    ($($ty:expr, $sub:expr, $name:literal, $min:expr;)*) => {
        &[$(RecordKind {
            device_type: $ty,
            subtype:     $sub,
            name:        $name,
            min_payload: $min,
        },)*]
    };
}

static RECORD_KINDS: &[RecordKind] = kinds! {
    DEVICE_TYPE_HARDWARE, hardware::PCI,        "Pci",            2;
    DEVICE_TYPE_HARDWARE, hardware::PCCARD,     "PcCard",         1;
    DEVICE_TYPE_HARDWARE, hardware::MMIO,       "MemoryMapped",   20;
    DEVICE_TYPE_HARDWARE, hardware::VENDOR,     "VenHw",          16;
    DEVICE_TYPE_HARDWARE, hardware::CONTROLLER, "Ctrl",           4;
    DEVICE_TYPE_HARDWARE, hardware::BMC,        "BMC",            9;

    DEVICE_TYPE_ACPI, acpi::HID,                "Acpi",           8;
    DEVICE_TYPE_ACPI, acpi::HIDEX,              "AcpiEx",         12;
    DEVICE_TYPE_ACPI, acpi::ADR,                "AcpiAdr",        4;

    DEVICE_TYPE_MESSAGE, message::ATAPI,        "Ata",            4;
    DEVICE_TYPE_MESSAGE, message::SCSI,         "Scsi",           4;
    DEVICE_TYPE_MESSAGE, message::FIBRE_CHAN,   "Fibre",          20;
    DEVICE_TYPE_MESSAGE, message::IEEE1394,     "I1394",          12;
    DEVICE_TYPE_MESSAGE, message::USB,          "USB",            2;
    DEVICE_TYPE_MESSAGE, message::I2O,          "I2O",            4;
    DEVICE_TYPE_MESSAGE, message::INFINIBAND,   "Infiniband",     44;
    DEVICE_TYPE_MESSAGE, message::VENDOR,       "VenMsg",         16;
    DEVICE_TYPE_MESSAGE, message::MAC_ADDR,     "MAC",            33;
    DEVICE_TYPE_MESSAGE, message::IPV4,         "IPv4",           23;
    DEVICE_TYPE_MESSAGE, message::IPV6,         "IPv6",           56;
    DEVICE_TYPE_MESSAGE, message::UART,         "Uart",           15;
    DEVICE_TYPE_MESSAGE, message::USB_CLASS,    "UsbClass",       7;
    DEVICE_TYPE_MESSAGE, message::USB_WWID,     "UsbWwid",        6;
    DEVICE_TYPE_MESSAGE, message::LUN,          "Unit",           1;
    DEVICE_TYPE_MESSAGE, message::SATA,         "Sata",           6;
    DEVICE_TYPE_MESSAGE, message::ISCSI,        "iSCSI",          14;
    DEVICE_TYPE_MESSAGE, message::VLAN,         "Vlan",           2;
    DEVICE_TYPE_MESSAGE, message::FIBRE_CHAN_EX, "FibreEx",       20;
    DEVICE_TYPE_MESSAGE, message::SAS_EX,       "SasEx",          20;
    DEVICE_TYPE_MESSAGE, message::NVME,         "NVMe",           12;
    DEVICE_TYPE_MESSAGE, message::URI,          "Uri",            0;
    DEVICE_TYPE_MESSAGE, message::UFS,          "UFS",            2;
    DEVICE_TYPE_MESSAGE, message::SD,           "SD",             1;
    DEVICE_TYPE_MESSAGE, message::BLUETOOTH,    "Bluetooth",      6;
    DEVICE_TYPE_MESSAGE, message::WIFI,         "Wi-Fi",          32;
    DEVICE_TYPE_MESSAGE, message::EMMC,         "eMMC",           1;
    DEVICE_TYPE_MESSAGE, message::BLUETOOTH_LE, "BluetoothLE",    7;
    DEVICE_TYPE_MESSAGE, message::DNS,          "Dns",            1;
    DEVICE_TYPE_MESSAGE, message::NVDIMM,       "NVDIMM",         16;

    DEVICE_TYPE_MEDIA, media::HARD_DRIVE,       "HD",             38;
    DEVICE_TYPE_MEDIA, media::CDROM,            "CDROM",          20;
    DEVICE_TYPE_MEDIA, media::VENDOR,           "VenMedia",       16;
    DEVICE_TYPE_MEDIA, media::FILE,             "File",           0;
    DEVICE_TYPE_MEDIA, media::PROTOCOL,         "Media",          16;
    DEVICE_TYPE_MEDIA, media::FIRMWARE_FILE,    "FvFile",         0;
    DEVICE_TYPE_MEDIA, media::FIRMWARE_VOLUME,  "Fv",             0;
    DEVICE_TYPE_MEDIA, media::RELATIVE_OFFSET,  "Offset",         20;
    DEVICE_TYPE_MEDIA, media::RAM_DISK,         "RamDisk",        34;

    DEVICE_TYPE_BIOS_BOOT, bios::BBS,           "BBS",            4;

    DEVICE_TYPE_END, END_INSTANCE,              "EndInstance",    0;
    DEVICE_TYPE_END, END_ENTIRE,                "End",            0;
};

lazy_static! {
    static ref DISPATCH: HashMap<(u8, u8), &'static RecordKind> =
        RECORD_KINDS
            .iter()
            .map(|k| ((k.device_type, k.subtype), k))
            .collect();
}

/// Look up a (type, subtype) pair. `None` means the pair is not supported,
/// by either decoding or encoding.
pub fn record_kind(device_type: u8, subtype: u8)
    -> Option<&'static RecordKind>
{
    DISPATCH.get(&(device_type, subtype)).copied()
}

/// Vendor-defined node, shared by the hardware, messaging and media
/// families.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vendor {
    pub guid: EfiGuid,
    #[br(parse_with = until_eof)]
    pub data: Vec<u8>,
}

impl Vendor {
    fn fmt_as(&self, f: &mut fmt::Formatter, name: &str) -> fmt::Result {
        write!(f, "{}({}", name, self.guid)?;
        if !self.data.is_empty() {
            write!(f, ",{}", hex(&self.data))?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndKind {
    /// Separates alternate instances within one list.
    Instance,
    /// Terminates the whole list.
    Entire,
}

impl EndKind {
    fn subtype(&self) -> u8 {
        match self {
            EndKind::Instance => END_INSTANCE,
            EndKind::Entire => END_ENTIRE,
        }
    }

    fn decode(kind: &RecordKind, payload: &[u8]) -> Result<Self> {
        kind.expect_type(DEVICE_TYPE_END)?;
        if !payload.is_empty() {
            return Err(Error::LengthMismatch {
                declared: HEADER_LEN + payload.len(),
                actual:   HEADER_LEN,
            });
        }
        match kind.subtype {
            END_INSTANCE => Ok(EndKind::Instance),
            END_ENTIRE => Ok(EndKind::Entire),
            _ => Err(kind.unsupported()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DevicePathRecord {
    Hardware(HardwareRecord),
    Acpi(AcpiRecord),
    Message(MessageRecord),
    Media(MediaRecord),
    BiosBoot(BiosBoot),
    End(EndKind),
}

impl DevicePathRecord {
    pub fn device_type(&self) -> u8 {
        match self {
            DevicePathRecord::Hardware(_) => DEVICE_TYPE_HARDWARE,
            DevicePathRecord::Acpi(_) => DEVICE_TYPE_ACPI,
            DevicePathRecord::Message(_) => DEVICE_TYPE_MESSAGE,
            DevicePathRecord::Media(_) => DEVICE_TYPE_MEDIA,
            DevicePathRecord::BiosBoot(_) => DEVICE_TYPE_BIOS_BOOT,
            DevicePathRecord::End(_) => DEVICE_TYPE_END,
        }
    }

    pub fn subtype(&self) -> u8 {
        match self {
            DevicePathRecord::Hardware(r) => r.subtype(),
            DevicePathRecord::Acpi(r) => r.subtype(),
            DevicePathRecord::Message(r) => r.subtype(),
            DevicePathRecord::Media(r) => r.subtype(),
            DevicePathRecord::BiosBoot(_) => bios::BBS,
            DevicePathRecord::End(e) => e.subtype(),
        }
    }

    pub fn kind(&self) -> Option<&'static RecordKind> {
        record_kind(self.device_type(), self.subtype())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, DevicePathRecord::End(_))
    }

    pub fn is_end_of_list(&self) -> bool {
        matches!(self, DevicePathRecord::End(EndKind::Entire))
    }

    /// The path string of a Media/File record.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            DevicePathRecord::Media(MediaRecord::File(f)) =>
                Some(f.path.as_str()),
            _ => None,
        }
    }

    /// Decode one complete record, header included. The length in the
    /// header must account for exactly the bytes in `record`.
    pub fn parse(record: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(record);
        let device_type = c.read_u8()?;
        let subtype = c.read_u8()?;
        let declared = c.read_u16()? as usize;

        if declared < HEADER_LEN {
            return Err(Error::BadRecordLength { offset: 0, length: declared });
        }
        if declared != record.len() {
            return Err(Error::LengthMismatch {
                declared,
                actual: record.len(),
            });
        }
        decode_record(device_type, subtype, c.rest())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_record(self)
    }
}

impl TryFrom<&[u8]> for DevicePathRecord {
    type Error = Error;

    fn try_from(record: &[u8]) -> Result<Self> {
        Self::parse(record)
    }
}

impl fmt::Display for DevicePathRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DevicePathRecord::Hardware(r) => fmt::Display::fmt(r, f),
            DevicePathRecord::Acpi(r) => fmt::Display::fmt(r, f),
            DevicePathRecord::Message(r) => fmt::Display::fmt(r, f),
            DevicePathRecord::Media(r) => fmt::Display::fmt(r, f),
            DevicePathRecord::BiosBoot(r) => fmt::Display::fmt(r, f),
            DevicePathRecord::End(EndKind::Instance) => write!(f, ","),
            DevicePathRecord::End(EndKind::Entire) => Ok(()),
        }
    }
}

/// Decode the payload of a record whose header has already been read.
///
/// A header-only record (empty payload) of a fixed layout kind decodes as
/// if its payload were all zeroes.
pub fn decode_record(device_type: u8, subtype: u8, payload: &[u8])
    -> Result<DevicePathRecord>
{
    let kind = record_kind(device_type, subtype)
        .ok_or(Error::UnsupportedRecord { device_type, subtype })?;

    let zeroed;
    let payload = if payload.is_empty() && kind.min_payload > 0 {
        log::debug!("{} record has no payload, using defaults", kind.name);
        zeroed = vec![0u8; kind.min_payload];
        &zeroed[..]
    } else if payload.len() < kind.min_payload {
        return Err(Error::TruncatedInput {
            needed:    kind.min_payload,
            available: payload.len(),
        });
    } else {
        payload
    };

    Ok(match device_type {
        DEVICE_TYPE_HARDWARE =>
            DevicePathRecord::Hardware(HardwareRecord::decode(kind, payload)?),
        DEVICE_TYPE_ACPI =>
            DevicePathRecord::Acpi(AcpiRecord::decode(kind, payload)?),
        DEVICE_TYPE_MESSAGE =>
            DevicePathRecord::Message(MessageRecord::decode(kind, payload)?),
        DEVICE_TYPE_MEDIA =>
            DevicePathRecord::Media(MediaRecord::decode(kind, payload)?),
        DEVICE_TYPE_BIOS_BOOT =>
            DevicePathRecord::BiosBoot(BiosBoot::decode(kind, payload)?),
        DEVICE_TYPE_END =>
            DevicePathRecord::End(EndKind::decode(kind, payload)?),
        _ => return Err(kind.unsupported()),
    })
}

/// Encode a record, header included, patching the length field with the
/// number of bytes actually produced.
pub fn encode_record(record: &DevicePathRecord) -> Result<Vec<u8>> {
    let device_type = record.device_type();
    let subtype = record.subtype();
    if record_kind(device_type, subtype).is_none() {
        return Err(Error::UnsupportedRecord { device_type, subtype });
    }

    let mut out = vec![device_type, subtype, 0, 0];
    match record {
        DevicePathRecord::Hardware(r) => r.encode(&mut out)?,
        DevicePathRecord::Acpi(r) => r.encode(&mut out)?,
        DevicePathRecord::Message(r) => r.encode(&mut out)?,
        DevicePathRecord::Media(r) => r.encode(&mut out)?,
        DevicePathRecord::BiosBoot(r) => r.encode(&mut out)?,
        DevicePathRecord::End(_) => {}
    }

    let len = u16::try_from(out.len())
        .map_err(|_| Error::RecordTooLarge(out.len()))?;
    out[2..4].copy_from_slice(&write_u16le(len));
    Ok(out)
}

/// Render a list in the UEFI text notation: nodes separated by `/`,
/// instances by `,`.
pub fn device_path_to_text(records: &[DevicePathRecord]) -> String {
    let mut out = String::new();
    let mut first = true;
    for r in records {
        match r {
            DevicePathRecord::End(EndKind::Entire) => break,
            DevicePathRecord::End(EndKind::Instance) => {
                out.push(',');
                first = true;
            }
            r => {
                if !first {
                    out.push('/');
                }
                out.push_str(&r.to_string());
                first = false;
            }
        }
    }
    out
}

/// Read a fixed layout payload. Bytes left over after the layout are an
/// error.
pub(crate) fn decode_fixed<T>(payload: &[u8]) -> Result<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    let mut c = Cursor::new(payload);
    let value = T::read_options(&mut c, Endian::Little, ())
        .map_err(|e| Error::from_binrw(e, payload.len() + 1, payload.len()))?;
    let used = c.position() as usize;
    if used != payload.len() {
        return Err(Error::LengthMismatch {
            declared: HEADER_LEN + payload.len(),
            actual:   HEADER_LEN + used,
        });
    }
    Ok(value)
}

pub(crate) fn encode_fixed<T>(value: &T, out: &mut Vec<u8>) -> Result<()>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut c = Cursor::new(Vec::new());
    value
        .write_options(&mut c, Endian::Little, ())
        .map_err(Error::Binary)?;
    out.extend_from_slice(&c.into_inner());
    Ok(())
}

pub(crate) fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}
