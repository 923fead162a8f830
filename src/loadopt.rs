//! `EFI_LOAD_OPTION`, the payload of the `BootXXXX` and similar variables.
//! See section 3.1.3 of the UEFI specification.
//!
//! ```text
//! attributes:u32  path_list_length:u16  description:UCS-2Z
//! device_path_list[path_list_length]  optional_data[..]
//! ```

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::devpath::{
    find_file_path, format_list, parse_list, DevicePathList,
    DevicePathRecord, HardwareRecord, MediaRecord, MessageRecord,
};
use crate::error::{Error, Result};
use crate::guid::EfiGuid;
use crate::primitive::{read_u16le, read_u32le, write_u16le, write_u32le};
use crate::ucs2::{decode_ucs2, encode_ucs2};

pub const LOAD_OPTION_ACTIVE: u32          = 0x0000_0001;
pub const LOAD_OPTION_FORCE_RECONNECT: u32 = 0x0000_0002;
pub const LOAD_OPTION_HIDDEN: u32          = 0x0000_0008;
pub const LOAD_OPTION_CATEGORY: u32        = 0x0000_1f00;
pub const LOAD_OPTION_CATEGORY_BOOT: u32   = 0x0000_0000;
pub const LOAD_OPTION_CATEGORY_APP: u32    = 0x0000_0100;

const HEADER_LEN: usize = 6;

/// Where each part of a load option lives within its buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptionLayout {
    pub attributes:         u32,
    pub path_list_length:   usize,
    pub description:        String,
    /// Bytes of description, not counting the terminator.
    pub description_length: usize,
    pub path_list:          Range<usize>,
    pub optional_data:      Range<usize>,
}

impl LoadOptionLayout {
    /// Slice `buf` into its four parts. The description length is always
    /// recovered by scanning for the terminator. The records inside the
    /// path list are not looked at.
    pub fn scan(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(Error::TruncatedInput {
                needed:    HEADER_LEN,
                available: buf.len(),
            });
        }
        let attributes = read_u32le(buf, 0)?;
        let path_list_length = read_u16le(buf, 4)? as usize;

        let desc = decode_ucs2(buf, HEADER_LEN, buf.len() - HEADER_LEN);
        if !desc.terminated {
            return Err(Error::Unterminated("description"));
        }

        let path_start = HEADER_LEN + desc.len + 2;
        let path_end = path_start + path_list_length;
        if path_end > buf.len() {
            return Err(Error::LengthMismatch {
                declared: path_end,
                actual:   buf.len(),
            });
        }

        Ok(LoadOptionLayout {
            attributes,
            path_list_length,
            description: desc.text,
            description_length: desc.len,
            path_list: path_start..path_end,
            optional_data: path_end..buf.len(),
        })
    }
}

pub fn is_valid(buf: &[u8]) -> bool {
    LoadOptionLayout::scan(buf).is_ok()
}

/// The description, or an empty string if `buf` is not a valid load option.
pub fn extract_name(buf: &[u8]) -> String {
    LoadOptionLayout::scan(buf)
        .map(|l| l.description)
        .unwrap_or_default()
}

/// Path of the first file node, or an empty string.
pub fn extract_path(buf: &[u8]) -> String {
    let Ok(layout) = LoadOptionLayout::scan(buf) else {
        return String::new();
    };
    parse_list(&buf[layout.path_list], layout.path_list_length)
        .ok()
        .and_then(|records| find_file_path(&records).map(str::to_string))
        .unwrap_or_default()
}

pub fn extract_optional_data(buf: &[u8]) -> &[u8] {
    match LoadOptionLayout::scan(buf) {
        Ok(layout) => &buf[layout.optional_data],
        Err(_) => &[],
    }
}

/// What a boot entry ultimately points at, judged from its device path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BootTarget {
    Unknown,
    Pci { device: u8, function: u8 },
    App(EfiGuid),
    Path(String),
}

impl fmt::Display for BootTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BootTarget::Pci { device, function } =>
                write!(f, "PCI {}.{}", device, function),
            BootTarget::App(guid) => match guid.name() {
                Some(name) => write!(f, "App {}", name),
                None => write!(f, "App {}", guid),
            },
            BootTarget::Path(path) => write!(f, "Path {}", path),
            BootTarget::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadOption {
    pub attributes:       u32,
    pub description:      String,
    pub device_path_list: DevicePathList,
    pub optional_data:    Vec<u8>,
}

impl LoadOption {
    pub fn new(attributes: u32, description: &str,
        device_path_list: DevicePathList) -> Self
    {
        LoadOption {
            attributes,
            description: description.to_string(),
            device_path_list,
            optional_data: Vec::new(),
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self> {
        let layout = LoadOptionLayout::scan(buf)?;
        let device_path_list = parse_list(&buf[layout.path_list.clone()],
            layout.path_list_length)?;
        Ok(LoadOption {
            attributes: layout.attributes,
            description: layout.description,
            device_path_list,
            optional_data: buf[layout.optional_data].to_vec(),
        })
    }

    /// Serialize back to the wire layout. The result is checked with
    /// [`is_valid`] before it is returned.
    pub fn format(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&write_u32le(self.attributes));
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&encode_ucs2(&self.description, true));

        let path_start = out.len();
        out.extend_from_slice(&format_list(&self.device_path_list)?);
        let path_len = out.len() - path_start;
        let path_len = u16::try_from(path_len)
            .map_err(|_| Error::RecordTooLarge(path_len))?;
        out[4..6].copy_from_slice(&write_u16le(path_len));

        out.extend_from_slice(&self.optional_data);

        LoadOptionLayout::scan(&out)?;
        Ok(out)
    }

    pub fn name(&self) -> &str {
        &self.description
    }

    pub fn device_path_list(&self) -> &[DevicePathRecord] {
        &self.device_path_list
    }

    /// Path of the first file node before any end node, or "".
    pub fn short_path(&self) -> &str {
        find_file_path(&self.device_path_list).unwrap_or("")
    }

    pub fn is_visible(&self) -> bool {
        self.attributes & LOAD_OPTION_ACTIVE != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes & LOAD_OPTION_HIDDEN != 0
    }

    pub fn category(&self) -> u32 {
        self.attributes & LOAD_OPTION_CATEGORY
    }

    /// Later nodes win, so a file node after a PCI node makes this a path.
    pub fn boot_target(&self) -> BootTarget {
        let mut target = BootTarget::Unknown;
        for r in &self.device_path_list {
            match r {
                DevicePathRecord::Hardware(HardwareRecord::Pci(p)) => {
                    target = BootTarget::Pci {
                        device:   p.device,
                        function: p.function,
                    };
                }
                DevicePathRecord::Media(MediaRecord::FirmwareFile(n)) => {
                    if let Some(guid) = n.name_guid() {
                        target = BootTarget::App(guid);
                    }
                }
                DevicePathRecord::Media(MediaRecord::File(p)) => {
                    target = BootTarget::Path(p.path.clone());
                }
                _ => {}
            }
        }
        target
    }

    pub fn uses_uri(&self) -> bool {
        self.device_path_list.iter().any(|r| {
            matches!(r, DevicePathRecord::Message(MessageRecord::Uri(_)))
        })
    }
}

impl TryFrom<&[u8]> for LoadOption {
    type Error = Error;

    fn try_from(buf: &[u8]) -> Result<Self> {
        Self::parse(buf)
    }
}
