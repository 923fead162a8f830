//! Hardware device path nodes (type 0x01), UEFI 2.x section 10.3.2.

use std::fmt;

use binrw::binrw;
use serde::Serialize;

use super::{
    decode_fixed, encode_fixed, RecordKind, Vendor, DEVICE_TYPE_HARDWARE,
};
use crate::error::Result;

pub const PCI: u8        = 0x01;
pub const PCCARD: u8     = 0x02;
pub const MMIO: u8       = 0x03;
pub const VENDOR: u8     = 0x04;
pub const CONTROLLER: u8 = 0x05;
pub const BMC: u8        = 0x06;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pci {
    pub function: u8,
    pub device:   u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PcCard {
    pub function: u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryMapped {
    pub memory_type: u32,
    pub start:       u64,
    pub end:         u64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controller {
    pub controller: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bmc {
    /// 0 unknown, 1 KCS, 2 SMIC, 3 block transfer.
    pub interface_type: u8,
    pub base_address:   u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HardwareRecord {
    Pci(Pci),
    PcCard(PcCard),
    MemoryMapped(MemoryMapped),
    Vendor(Vendor),
    Controller(Controller),
    Bmc(Bmc),
}

impl HardwareRecord {
    pub fn subtype(&self) -> u8 {
        match self {
            HardwareRecord::Pci(_) => PCI,
            HardwareRecord::PcCard(_) => PCCARD,
            HardwareRecord::MemoryMapped(_) => MMIO,
            HardwareRecord::Vendor(_) => VENDOR,
            HardwareRecord::Controller(_) => CONTROLLER,
            HardwareRecord::Bmc(_) => BMC,
        }
    }

    pub(crate) fn decode(kind: &RecordKind, payload: &[u8]) -> Result<Self> {
        kind.expect_type(DEVICE_TYPE_HARDWARE)?;
        Ok(match kind.subtype {
            PCI => HardwareRecord::Pci(decode_fixed(payload)?),
            PCCARD => HardwareRecord::PcCard(decode_fixed(payload)?),
            MMIO => HardwareRecord::MemoryMapped(decode_fixed(payload)?),
            VENDOR => HardwareRecord::Vendor(decode_fixed(payload)?),
            CONTROLLER => HardwareRecord::Controller(decode_fixed(payload)?),
            BMC => HardwareRecord::Bmc(decode_fixed(payload)?),
            _ => return Err(kind.unsupported()),
        })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            HardwareRecord::Pci(v) => encode_fixed(v, out),
            HardwareRecord::PcCard(v) => encode_fixed(v, out),
            HardwareRecord::MemoryMapped(v) => encode_fixed(v, out),
            HardwareRecord::Vendor(v) => encode_fixed(v, out),
            HardwareRecord::Controller(v) => encode_fixed(v, out),
            HardwareRecord::Bmc(v) => encode_fixed(v, out),
        }
    }
}

impl fmt::Display for HardwareRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HardwareRecord::Pci(p) =>
                write!(f, "Pci({:#x},{:#x})", p.device, p.function),
            HardwareRecord::PcCard(p) =>
                write!(f, "PcCard({:#x})", p.function),
            HardwareRecord::MemoryMapped(m) =>
                write!(f, "MemoryMapped({:#x},{:#x},{:#x})",
                    m.memory_type, m.start, m.end),
            HardwareRecord::Vendor(v) => v.fmt_as(f, "VenHw"),
            HardwareRecord::Controller(c) =>
                write!(f, "Ctrl({:#x})", c.controller),
            HardwareRecord::Bmc(b) =>
                write!(f, "BMC({},{:#x})", b.interface_type, b.base_address),
        }
    }
}
