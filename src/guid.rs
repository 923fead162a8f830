use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use binrw::binrw;
use serde::{Serialize, Serializer};

use crate::error::Error;

pub const EFI_GLOBAL_VARIABLE_GUID: EfiGuid = EfiGuid {
    data1: 0x8be4_df61,
    data2: 0x93ca,
    data3: 0x11d2,
    data4: [0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c],
};

/// An EFI GUID in its mixed-endian wire layout: three little-endian
/// integers followed by eight bytes in network order.
#[binrw]
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
pub struct EfiGuid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl EfiGuid {
    pub fn from_bytes(b: &[u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&b[8..]);
        Self {
            data1: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            data2: u16::from_le_bytes([b[4], b[5]]),
            data3: u16::from_le_bytes([b[6], b[7]]),
            data4,
        }
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut b = [0u8; 16];
        b[..4].copy_from_slice(&self.data1.to_le_bytes());
        b[4..6].copy_from_slice(&self.data2.to_le_bytes());
        b[6..8].copy_from_slice(&self.data3.to_le_bytes());
        b[8..].copy_from_slice(&self.data4);
        b
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// The symbolic name of a well-known GUID, if there is one.
    pub fn name(&self) -> Option<&'static str> {
        resolve_guid(self)
    }
}

pub fn bytes_to_guid(b: &[u8; 16]) -> EfiGuid {
    EfiGuid::from_bytes(b)
}

pub fn guid_to_bytes(guid: &EfiGuid) -> [u8; 16] {
    guid.to_bytes()
}

impl From<[u8; 16]> for EfiGuid {
    fn from(b: [u8; 16]) -> Self {
        Self::from_bytes(&b)
    }
}

impl fmt::Display for EfiGuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-\
            {:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1],
            self.data4[2], self.data4[3], self.data4[4], self.data4[5],
            self.data4[6], self.data4[7])
    }
}

impl FromStr for EfiGuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidGuid(s.to_string());

        let parts: Vec<&str> = s.split('-').collect();
        let widths = [8, 4, 4, 4, 12];
        if parts.len() != widths.len()
            || parts.iter().zip(widths).any(|(p, w)| {
                p.len() != w || !p.bytes().all(|b| b.is_ascii_hexdigit())
            })
        {
            return Err(invalid());
        }

        let hex = |p: &str| u32::from_str_radix(p, 16).map_err(|_| invalid());
        let mut guid = EfiGuid {
            data1: hex(parts[0])?,
            data2: hex(parts[1])? as u16,
            data3: hex(parts[2])? as u16,
            data4: [0; 8],
        };
        let tail = parts[3].as_bytes().chunks(2)
            .chain(parts[4].as_bytes().chunks(2));
        for (slot, pair) in guid.data4.iter_mut().zip(tail) {
            // all ascii hex, checked above
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *slot = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(guid)
    }
}

impl Serialize for EfiGuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub fn resolve_guid(guid: &EfiGuid) -> Option<&'static str> {
    KNOWN_GUIDS.get(guid).copied()
}

lazy_static! {
    static ref KNOWN_GUIDS: HashMap<EfiGuid, &'static str> = {
        [
            ("8be4df61-93ca-11d2-aa0d-00e098032b8c",
                "GLOBAL_VARIABLE"),
            ("fab7e9e1-39dd-4f2b-8408-e20e906cb6de",
                "HD_BOOT_DEVICE_PATH_VARIABLE"),
            ("eb704011-1402-11d3-8e77-00a0c969723b",
                "MTC_VENDOR"),
            ("77fa9abd-0359-4d32-bd60-28f4e78f784b",
                "SecureBootPlatformID"),

            // Vendor-defined device path nodes
            ("e0c14753-f9be-11d2-9a0c-0090273fc14d",
                "PC_ANSI"),
            ("dfa66065-b419-11d3-9a2d-0090273fc14d",
                "VT_100"),
            ("7baec70b-57e0-4c76-8e87-2f9e28088343",
                "VT_100_PLUS"),
            ("ad15a0d6-8bec-4acf-a073-d01de77e2d88",
                "VT_UTF8"),
            ("37499a9d-542f-4c89-a026-35da142094e4",
                "UART_FLOW_CONTROL"),
            ("d487ddb4-008b-11d9-afdc-001083ffca4d",
                "SAS_DEVICE_PATH"),
            ("0d0ef4f4-6afb-4e31-8c8e-aee1b7a7ca3b",
                "DEBUGPORT"),

            // RAM disk types
            ("77ab535a-45fc-624b-5560-f7b281d1f96e",
                "VirtualDisk"),
            ("3d5abd30-4175-87ce-6d64-d2ade523c4bb",
                "VirtualCD"),
            ("5cea02c9-4d07-69d3-269f-4496fbe096f9",
                "PersistentVirtualDisk"),
            ("08018188-42cd-bb48-100f-5387d53ded3d",
                "PersistentVirtualCD"),

            // Firmware applications commonly found in Boot#### entries
            ("7c04a583-9e3e-4f1c-ad65-e05268d0b4d1",
                "EFI_SHELL"),
            ("462caa21-7614-4503-836e-8ab6f4662331",
                "UI_APP"),
            ("eec25bdc-67f2-4d95-b1d5-f81b2039d11d",
                "BOOT_MANAGER_MENU_APP"),

            ("09576e91-6d3f-11d2-8e39-00a0c969723b",
                "EFI_DEVICE_PATH_PROTOCOL_GUID"),
            ("964e5b21-6459-11d2-8e39-00a0c969723b",
                "EFI_BLOCK_IO_PROTOCOL_GUID"),
            ("964e5b22-6459-11d2-8e39-00a0c969723b",
                "EFI_SIMPLE_FILE_SYSTEM_PROTOCOL_GUID"),
            ("5b1b31a1-9562-11d2-8e3f-00a0c969723b",
                "EFI_LOADED_IMAGE_PROTOCOL_GUID"),
            ("bc62157e-3e33-4fec-9920-2d3b36d750df",
                "EFI_LOADED_IMAGE_DEVICE_PATH_PROTOCOL_GUID"),
            ("4cf5b200-68b8-4ca5-9eec-b23e3f50029a",
                "EFI_PCI_IO_PROTOCOL_GUID"),
            ("03c4e603-ac28-11d3-9a2d-0090273fc14d",
                "EFI_PXE_BASE_CODE_PROTOCOL_GUID"),
            ("7a59b29b-910b-4171-8242-a85a0df25b5b",
                "EFI_HTTP_PROTOCOL_GUID"),
        ]
        .into_iter()
        .filter_map(|(s, name)| s.parse().ok().map(|g: EfiGuid| (g, name)))
        .collect()
    };
}
