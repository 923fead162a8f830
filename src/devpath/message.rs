//! Messaging device path nodes (type 0x03).
//!
//! Layouts follow UEFI 2.x section 10.3.4. Every multi-byte integer is
//! little-endian; addresses, WWNs and LUNs that the specification defines as
//! byte arrays are kept as byte arrays.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use binrw::binrw;
use binrw::helpers::until_eof;
use binrw::io::Read;
use binrw::BinResult;
use serde::Serialize;

use super::{
    decode_fixed, encode_fixed, hex, RecordKind, Vendor, DEVICE_TYPE_MESSAGE,
};
use crate::error::Result;
use crate::ucs2;

pub const ATAPI: u8         = 1;
pub const SCSI: u8          = 2;
pub const FIBRE_CHAN: u8    = 3;
pub const IEEE1394: u8      = 4;
pub const USB: u8           = 5;
pub const I2O: u8           = 6;
pub const INFINIBAND: u8    = 9;
pub const VENDOR: u8        = 10;
pub const MAC_ADDR: u8      = 11;
pub const IPV4: u8          = 12;
pub const IPV6: u8          = 13;
pub const UART: u8          = 14;
pub const USB_CLASS: u8     = 15;
pub const USB_WWID: u8      = 16;
pub const LUN: u8           = 17;
pub const SATA: u8          = 18;
pub const ISCSI: u8         = 19;
pub const VLAN: u8          = 20;
pub const FIBRE_CHAN_EX: u8 = 21;
pub const SAS_EX: u8        = 22;
pub const NVME: u8          = 23;
pub const URI: u8           = 24;
pub const UFS: u8           = 25;
pub const SD: u8            = 26;
pub const BLUETOOTH: u8     = 27;
pub const WIFI: u8          = 28;
pub const EMMC: u8          = 29;
pub const BLUETOOTH_LE: u8  = 30;
pub const DNS: u8           = 31;
pub const NVDIMM: u8        = 32;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Atapi {
    pub primary_secondary: u8,
    pub slave_master:      u8,
    pub lun:               u16,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scsi {
    pub target: u16,
    pub lun:    u16,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FibreChannel {
    pub reserved: u32,
    pub wwn:      u64,
    pub lun:      u64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ieee1394 {
    pub reserved: u32,
    pub guid:     u64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Usb {
    pub parent_port: u8,
    pub interface:   u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct I2o {
    pub tid: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Infiniband {
    pub resource_flags: u32,
    pub port_gid:       [u8; 16],
    pub service_id:     u64,
    pub target_port_id: u64,
    pub device_id:      u64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacAddr {
    pub address: [u8; 32],
    pub if_type: u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ipv4 {
    pub local_ip:    [u8; 4],
    pub remote_ip:   [u8; 4],
    pub local_port:  u16,
    pub remote_port: u16,
    pub protocol:    u16,
    pub static_ip:   u8,
    pub gateway:     [u8; 4],
    pub subnet_mask: [u8; 4],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ipv6 {
    pub local_ip:      [u8; 16],
    pub remote_ip:     [u8; 16],
    pub local_port:    u16,
    pub remote_port:   u16,
    pub protocol:      u16,
    pub ip_origin:     u8,
    pub prefix_length: u8,
    pub gateway:       [u8; 16],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uart {
    pub reserved:  u32,
    pub baud_rate: u64,
    pub data_bits: u8,
    pub parity:    u8,
    pub stop_bits: u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsbClass {
    pub vendor_id:  u16,
    pub product_id: u16,
    pub class:      u8,
    pub subclass:   u8,
    pub protocol:   u8,
}

/// The serial number is an unterminated UCS-2 string filling the rest of
/// the node.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsbWwid {
    pub interface:     u16,
    pub vendor_id:     u16,
    pub product_id:    u16,
    #[br(parse_with = ucs2::parse_until_eof)]
    #[bw(write_with = ucs2::write_unterminated)]
    pub serial_number: String,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lun {
    pub lun: u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sata {
    pub hba_port:             u16,
    pub port_multiplier_port: u16,
    pub lun:                  u16,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Iscsi {
    pub protocol:    u16,
    pub options:     u16,
    pub lun:         [u8; 8],
    pub tpgt:        u16,
    #[br(parse_with = until_eof)]
    pub target_name: Vec<u8>,
}

impl Iscsi {
    pub fn target_name(&self) -> String {
        String::from_utf8_lossy(&self.target_name).into_owned()
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vlan {
    pub vlan_id: u16,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FibreChannelEx {
    pub reserved: u32,
    pub wwn:      [u8; 8],
    pub lun:      [u8; 8],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SasEx {
    pub address:              [u8; 8],
    pub lun:                  [u8; 8],
    pub topology:             u16,
    pub relative_target_port: u16,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nvme {
    pub namespace_id: u32,
    pub eui64:        [u8; 8],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uri {
    #[br(parse_with = until_eof)]
    pub uri: Vec<u8>,
}

impl Uri {
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.uri).into_owned()
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ufs {
    pub pun: u8,
    pub lun: u8,
}

/// Slot number of an SD or eMMC controller.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub slot: u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bluetooth {
    pub address: [u8; 6],
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wifi {
    pub ssid: [u8; 32],
}

impl Wifi {
    pub fn ssid(&self) -> String {
        let end = self.ssid.iter().position(|&b| b == 0)
            .unwrap_or(self.ssid.len());
        String::from_utf8_lossy(&self.ssid[..end]).into_owned()
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BluetoothLe {
    pub address:      [u8; 6],
    pub address_type: u8,
}

/// DNS server list. Every address occupies a 16-byte `EFI_IP_ADDRESS`
/// slot; IPv4 servers use the first four bytes.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dns {
    pub is_ipv6:   u8,
    #[br(parse_with = parse_ip_slots)]
    pub addresses: Vec<[u8; 16]>,
}

#[binrw::parser(reader)]
fn parse_ip_slots() -> BinResult<Vec<[u8; 16]>> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    if raw.len() % 16 != 0 {
        log::debug!("Dns: {} bytes is not a whole number of addresses",
            raw.len());
        return Ok(Vec::new());
    }
    Ok(raw
        .chunks_exact(16)
        .map(|c| {
            let mut slot = [0u8; 16];
            slot.copy_from_slice(c);
            slot
        })
        .collect())
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nvdimm {
    pub uuid: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MessageRecord {
    Atapi(Atapi),
    Scsi(Scsi),
    FibreChannel(FibreChannel),
    Ieee1394(Ieee1394),
    Usb(Usb),
    I2o(I2o),
    Infiniband(Infiniband),
    Vendor(Vendor),
    MacAddr(MacAddr),
    Ipv4(Ipv4),
    Ipv6(Ipv6),
    Uart(Uart),
    UsbClass(UsbClass),
    UsbWwid(UsbWwid),
    Lun(Lun),
    Sata(Sata),
    Iscsi(Iscsi),
    Vlan(Vlan),
    FibreChannelEx(FibreChannelEx),
    SasEx(SasEx),
    Nvme(Nvme),
    Uri(Uri),
    Ufs(Ufs),
    Sd(Slot),
    Bluetooth(Bluetooth),
    Wifi(Wifi),
    Emmc(Slot),
    BluetoothLe(BluetoothLe),
    Dns(Dns),
    Nvdimm(Nvdimm),
}

impl MessageRecord {
    pub fn subtype(&self) -> u8 {
        match self {
            MessageRecord::Atapi(_) => ATAPI,
            MessageRecord::Scsi(_) => SCSI,
            MessageRecord::FibreChannel(_) => FIBRE_CHAN,
            MessageRecord::Ieee1394(_) => IEEE1394,
            MessageRecord::Usb(_) => USB,
            MessageRecord::I2o(_) => I2O,
            MessageRecord::Infiniband(_) => INFINIBAND,
            MessageRecord::Vendor(_) => VENDOR,
            MessageRecord::MacAddr(_) => MAC_ADDR,
            MessageRecord::Ipv4(_) => IPV4,
            MessageRecord::Ipv6(_) => IPV6,
            MessageRecord::Uart(_) => UART,
            MessageRecord::UsbClass(_) => USB_CLASS,
            MessageRecord::UsbWwid(_) => USB_WWID,
            MessageRecord::Lun(_) => LUN,
            MessageRecord::Sata(_) => SATA,
            MessageRecord::Iscsi(_) => ISCSI,
            MessageRecord::Vlan(_) => VLAN,
            MessageRecord::FibreChannelEx(_) => FIBRE_CHAN_EX,
            MessageRecord::SasEx(_) => SAS_EX,
            MessageRecord::Nvme(_) => NVME,
            MessageRecord::Uri(_) => URI,
            MessageRecord::Ufs(_) => UFS,
            MessageRecord::Sd(_) => SD,
            MessageRecord::Bluetooth(_) => BLUETOOTH,
            MessageRecord::Wifi(_) => WIFI,
            MessageRecord::Emmc(_) => EMMC,
            MessageRecord::BluetoothLe(_) => BLUETOOTH_LE,
            MessageRecord::Dns(_) => DNS,
            MessageRecord::Nvdimm(_) => NVDIMM,
        }
    }

    pub(crate) fn decode(kind: &RecordKind, p: &[u8]) -> Result<Self> {
        use MessageRecord as M;

        kind.expect_type(DEVICE_TYPE_MESSAGE)?;
        Ok(match kind.subtype {
            ATAPI => M::Atapi(decode_fixed(p)?),
            SCSI => M::Scsi(decode_fixed(p)?),
            FIBRE_CHAN => M::FibreChannel(decode_fixed(p)?),
            IEEE1394 => M::Ieee1394(decode_fixed(p)?),
            USB => M::Usb(decode_fixed(p)?),
            I2O => M::I2o(decode_fixed(p)?),
            INFINIBAND => M::Infiniband(decode_fixed(p)?),
            VENDOR => M::Vendor(decode_fixed(p)?),
            MAC_ADDR => M::MacAddr(decode_fixed(p)?),
            IPV4 => M::Ipv4(decode_fixed(p)?),
            IPV6 => M::Ipv6(decode_fixed(p)?),
            UART => M::Uart(decode_fixed(p)?),
            USB_CLASS => M::UsbClass(decode_fixed(p)?),
            USB_WWID => M::UsbWwid(decode_fixed(p)?),
            LUN => M::Lun(decode_fixed(p)?),
            SATA => M::Sata(decode_fixed(p)?),
            ISCSI => M::Iscsi(decode_fixed(p)?),
            VLAN => M::Vlan(decode_fixed(p)?),
            FIBRE_CHAN_EX => M::FibreChannelEx(decode_fixed(p)?),
            SAS_EX => M::SasEx(decode_fixed(p)?),
            NVME => M::Nvme(decode_fixed(p)?),
            URI => M::Uri(decode_fixed(p)?),
            UFS => M::Ufs(decode_fixed(p)?),
            SD => M::Sd(decode_fixed(p)?),
            BLUETOOTH => M::Bluetooth(decode_fixed(p)?),
            WIFI => M::Wifi(decode_fixed(p)?),
            EMMC => M::Emmc(decode_fixed(p)?),
            BLUETOOTH_LE => M::BluetoothLe(decode_fixed(p)?),
            DNS => M::Dns(decode_fixed(p)?),
            NVDIMM => M::Nvdimm(decode_fixed(p)?),
            _ => return Err(kind.unsupported()),
        })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        use MessageRecord as M;

        match self {
            M::Atapi(v) => encode_fixed(v, out),
            M::Scsi(v) => encode_fixed(v, out),
            M::FibreChannel(v) => encode_fixed(v, out),
            M::Ieee1394(v) => encode_fixed(v, out),
            M::Usb(v) => encode_fixed(v, out),
            M::I2o(v) => encode_fixed(v, out),
            M::Infiniband(v) => encode_fixed(v, out),
            M::Vendor(v) => encode_fixed(v, out),
            M::MacAddr(v) => encode_fixed(v, out),
            M::Ipv4(v) => encode_fixed(v, out),
            M::Ipv6(v) => encode_fixed(v, out),
            M::Uart(v) => encode_fixed(v, out),
            M::UsbClass(v) => encode_fixed(v, out),
            M::UsbWwid(v) => encode_fixed(v, out),
            M::Lun(v) => encode_fixed(v, out),
            M::Sata(v) => encode_fixed(v, out),
            M::Iscsi(v) => encode_fixed(v, out),
            M::Vlan(v) => encode_fixed(v, out),
            M::FibreChannelEx(v) => encode_fixed(v, out),
            M::SasEx(v) => encode_fixed(v, out),
            M::Nvme(v) => encode_fixed(v, out),
            M::Uri(v) => encode_fixed(v, out),
            M::Ufs(v) => encode_fixed(v, out),
            M::Sd(v) | M::Emmc(v) => encode_fixed(v, out),
            M::Bluetooth(v) => encode_fixed(v, out),
            M::Wifi(v) => encode_fixed(v, out),
            M::BluetoothLe(v) => encode_fixed(v, out),
            M::Dns(v) => encode_fixed(v, out),
            M::Nvdimm(v) => encode_fixed(v, out),
        }
    }
}

fn protocol_name(protocol: u16) -> String {
    match protocol {
        6 => "TCP".to_string(),
        17 => "UDP".to_string(),
        p => format!("{:#x}", p),
    }
}

fn dashed(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join("-")
}

impl fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use MessageRecord as M;

        match self {
            M::Atapi(a) => write!(f, "Ata({},{},{:#x})",
                if a.primary_secondary == 0 { "Primary" } else { "Secondary" },
                if a.slave_master == 0 { "Master" } else { "Slave" },
                a.lun),
            M::Scsi(s) => write!(f, "Scsi({:#x},{:#x})", s.target, s.lun),
            M::FibreChannel(c) =>
                write!(f, "Fibre({:#x},{:#x})", c.wwn, c.lun),
            M::Ieee1394(i) => write!(f, "I1394({:016x})", i.guid),
            M::Usb(u) =>
                write!(f, "USB({:#x},{:#x})", u.parent_port, u.interface),
            M::I2o(i) => write!(f, "I2O({:#x})", i.tid),
            M::Infiniband(i) => write!(f, "Infiniband({:#x},{},{:#x},{:#x},{:#x})",
                i.resource_flags, hex(&i.port_gid), i.service_id,
                i.target_port_id, i.device_id),
            M::Vendor(v) => v.fmt_as(f, "VenMsg"),
            M::MacAddr(m) => {
                let n = if m.if_type <= 1 { 6 } else { m.address.len() };
                write!(f, "MAC({},{:#x})", hex(&m.address[..n]), m.if_type)
            }
            M::Ipv4(ip) => write!(f, "IPv4({}:{},{},{},{}:{})",
                Ipv4Addr::from(ip.remote_ip), ip.remote_port,
                protocol_name(ip.protocol),
                if ip.static_ip != 0 { "Static" } else { "DHCP" },
                Ipv4Addr::from(ip.local_ip), ip.local_port),
            M::Ipv6(ip) => write!(f, "IPv6([{}]:{},{},{},[{}]:{})",
                Ipv6Addr::from(ip.remote_ip), ip.remote_port,
                protocol_name(ip.protocol),
                match ip.ip_origin {
                    0 => "Static",
                    1 => "StatelessAutoConfigure",
                    _ => "StatefulAutoConfigure",
                },
                Ipv6Addr::from(ip.local_ip), ip.local_port),
            M::Uart(u) => write!(f, "Uart({},{},{},{})",
                u.baud_rate, u.data_bits, u.parity, u.stop_bits),
            M::UsbClass(u) => write!(f, "UsbClass({:#x},{:#x},{:#x},{:#x},{:#x})",
                u.vendor_id, u.product_id, u.class, u.subclass, u.protocol),
            M::UsbWwid(u) => write!(f, "UsbWwid({:#x},{:#x},{:#x},\"{}\")",
                u.vendor_id, u.product_id, u.interface, u.serial_number),
            M::Lun(l) => write!(f, "Unit({:#x})", l.lun),
            M::Sata(s) => write!(f, "Sata({:#x},{:#x},{:#x})",
                s.hba_port, s.port_multiplier_port, s.lun),
            M::Iscsi(i) => write!(f, "iSCSI({},{:#x},{},{:#x},{:#x})",
                i.target_name(), i.tpgt, hex(&i.lun), i.options, i.protocol),
            M::Vlan(v) => write!(f, "Vlan({})", v.vlan_id),
            M::FibreChannelEx(c) =>
                write!(f, "FibreEx({},{})", hex(&c.wwn), hex(&c.lun)),
            M::SasEx(s) => write!(f, "SasEx({},{},{:#x},{})",
                hex(&s.address), hex(&s.lun), s.topology,
                s.relative_target_port),
            M::Nvme(n) =>
                write!(f, "NVMe({:#x},{})", n.namespace_id, dashed(&n.eui64)),
            M::Uri(u) => write!(f, "Uri({})", u.as_string()),
            M::Ufs(u) => write!(f, "UFS({:#x},{:#x})", u.pun, u.lun),
            M::Sd(s) => write!(f, "SD({})", s.slot),
            M::Bluetooth(b) => write!(f, "Bluetooth({})", hex(&b.address)),
            M::Wifi(w) => write!(f, "Wi-Fi({})", w.ssid()),
            M::Emmc(s) => write!(f, "eMMC({})", s.slot),
            M::BluetoothLe(b) => write!(f, "BluetoothLE({},{})",
                hex(&b.address), b.address_type),
            M::Dns(d) => {
                write!(f, "Dns(")?;
                for (i, a) in d.addresses.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if d.is_ipv6 != 0 {
                        write!(f, "{}", Ipv6Addr::from(*a))?;
                    } else {
                        write!(f, "{}", Ipv4Addr::new(a[0], a[1], a[2], a[3]))?;
                    }
                }
                write!(f, ")")
            }
            M::Nvdimm(n) => write!(f, "NVDIMM({})", dashed(&n.uuid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devpath::{encode_record, DevicePathRecord};
    use crate::guid::EfiGuid;

    fn round_trip(r: MessageRecord) -> Vec<u8> {
        let rec = DevicePathRecord::Message(r);
        let raw = encode_record(&rec).unwrap();
        assert_eq!(raw[0], DEVICE_TYPE_MESSAGE);
        assert_eq!(u16::from_le_bytes([raw[2], raw[3]]) as usize, raw.len());
        assert_eq!(DevicePathRecord::parse(&raw).unwrap(), rec);
        raw
    }

    fn payload_len(r: MessageRecord) -> usize {
        round_trip(r).len() - 4
    }

    #[test]
    fn fixed_sizes() {
        use MessageRecord as M;

        assert_eq!(payload_len(M::Atapi(Atapi {
            primary_secondary: 1, slave_master: 0, lun: 2 })), 4);
        assert_eq!(payload_len(M::Scsi(Scsi { target: 1, lun: 2 })), 4);
        assert_eq!(payload_len(M::FibreChannel(FibreChannel {
            reserved: 0, wwn: 0x5000_c500_1234_5678, lun: 9 })), 20);
        assert_eq!(payload_len(M::Ieee1394(Ieee1394 {
            reserved: 0, guid: 42 })), 12);
        assert_eq!(payload_len(M::Usb(Usb {
            parent_port: 3, interface: 0 })), 2);
        assert_eq!(payload_len(M::I2o(I2o { tid: 77 })), 4);
        assert_eq!(payload_len(M::Infiniband(Infiniband {
            resource_flags: 1, port_gid: [7; 16], service_id: 2,
            target_port_id: 3, device_id: 4 })), 44);
        assert_eq!(payload_len(M::Uart(Uart {
            reserved: 0, baud_rate: 115_200, data_bits: 8, parity: 1,
            stop_bits: 1 })), 15);
        assert_eq!(payload_len(M::UsbClass(UsbClass {
            vendor_id: 0x046d, product_id: 0xc52b, class: 3, subclass: 1,
            protocol: 2 })), 7);
        assert_eq!(payload_len(M::Lun(Lun { lun: 5 })), 1);
        assert_eq!(payload_len(M::Sata(Sata {
            hba_port: 1, port_multiplier_port: 0xffff, lun: 0 })), 6);
        assert_eq!(payload_len(M::Vlan(Vlan { vlan_id: 100 })), 2);
        assert_eq!(payload_len(M::FibreChannelEx(FibreChannelEx {
            reserved: 0, wwn: [1; 8], lun: [2; 8] })), 20);
        assert_eq!(payload_len(M::SasEx(SasEx {
            address: [3; 8], lun: [0; 8], topology: 0x12,
            relative_target_port: 1 })), 20);
        assert_eq!(payload_len(M::Nvme(Nvme {
            namespace_id: 1, eui64: [0, 1, 2, 3, 4, 5, 6, 7] })), 12);
        assert_eq!(payload_len(M::Ufs(Ufs { pun: 0, lun: 1 })), 2);
        assert_eq!(payload_len(M::Sd(Slot { slot: 1 })), 1);
        assert_eq!(payload_len(M::Emmc(Slot { slot: 2 })), 1);
        assert_eq!(payload_len(M::Bluetooth(Bluetooth {
            address: [1, 2, 3, 4, 5, 6] })), 6);
        assert_eq!(payload_len(M::BluetoothLe(BluetoothLe {
            address: [6, 5, 4, 3, 2, 1], address_type: 1 })), 7);
        assert_eq!(payload_len(M::Nvdimm(Nvdimm { uuid: [9; 16] })), 16);
    }

    #[test]
    fn network_nodes() {
        let mut address = [0u8; 32];
        address[..6].copy_from_slice(&[0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
        let mac = MessageRecord::MacAddr(MacAddr { address, if_type: 1 });
        assert_eq!(mac.to_string(), "MAC(525400123456,0x1)");
        assert_eq!(payload_len(mac), 33);

        let v4 = MessageRecord::Ipv4(Ipv4 {
            local_ip:    [192, 168, 1, 10],
            remote_ip:   [192, 168, 1, 1],
            local_port:  0,
            remote_port: 69,
            protocol:    17,
            static_ip:   0,
            gateway:     [192, 168, 1, 1],
            subnet_mask: [255, 255, 255, 0],
        });
        assert_eq!(v4.to_string(), "IPv4(192.168.1.1:69,UDP,DHCP,192.168.1.10:0)");
        assert_eq!(payload_len(v4), 23);

        let v6 = MessageRecord::Ipv6(Ipv6 {
            local_ip:      [0; 16],
            remote_ip:     [0; 16],
            local_port:    0,
            remote_port:   0,
            protocol:      6,
            ip_origin:     1,
            prefix_length: 64,
            gateway:       [0; 16],
        });
        assert_eq!(payload_len(v6), 56);

        let mut ssid = [0u8; 32];
        ssid[..4].copy_from_slice(b"home");
        let wifi = MessageRecord::Wifi(Wifi { ssid });
        assert_eq!(wifi.to_string(), "Wi-Fi(home)");
        assert_eq!(payload_len(wifi), 32);
    }

    #[test]
    fn variable_nodes() {
        let uri = MessageRecord::Uri(Uri {
            uri: b"http://boot.example/grubx64.efi".to_vec(),
        });
        assert_eq!(uri.to_string(), "Uri(http://boot.example/grubx64.efi)");
        round_trip(uri);
        round_trip(MessageRecord::Uri(Uri { uri: Vec::new() }));

        let iscsi = MessageRecord::Iscsi(Iscsi {
            protocol:    0,
            options:     0x0800,
            lun:         [0; 8],
            tpgt:        1,
            target_name: b"iqn.2004-01.org.example:disk".to_vec(),
        });
        assert_eq!(payload_len(iscsi), 14 + 28);

        let guid: EfiGuid = "e0c14753-f9be-11d2-9a0c-0090273fc14d"
            .parse().unwrap();
        let vendor = MessageRecord::Vendor(Vendor { guid, data: vec![] });
        assert_eq!(vendor.to_string(),
            "VenMsg(e0c14753-f9be-11d2-9a0c-0090273fc14d)");
        round_trip(vendor);
    }

    #[test]
    fn usb_wwid_serial() {
        let raw = round_trip(MessageRecord::UsbWwid(UsbWwid {
            interface:     0,
            vendor_id:     0x0781,
            product_id:    0x5583,
            serial_number: "4C530001".to_string(),
        }));
        assert_eq!(raw.len(), 4 + 6 + 16);

        // a terminated serial decodes to the same text
        let mut term = raw.clone();
        term.extend_from_slice(&[0, 0]);
        term[2] += 2;
        match DevicePathRecord::parse(&term).unwrap() {
            DevicePathRecord::Message(MessageRecord::UsbWwid(u)) =>
                assert_eq!(u.serial_number, "4C530001"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dns_addresses() {
        let mut a = [0u8; 16];
        a[..4].copy_from_slice(&[8, 8, 8, 8]);
        let dns = MessageRecord::Dns(Dns { is_ipv6: 0, addresses: vec![a, a] });
        assert_eq!(dns.to_string(), "Dns(8.8.8.8,8.8.8.8)");
        assert_eq!(payload_len(dns), 33);

        // a ragged address list decodes as empty rather than failing
        let ragged = [0x03, 31, 0x0a, 0x00, 0, 1, 2, 3, 4, 5];
        match DevicePathRecord::parse(&ragged).unwrap() {
            DevicePathRecord::Message(MessageRecord::Dns(d)) =>
                assert!(d.addresses.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_ipv4_rejected() {
        // the pre-2.x 15 byte layout is shorter than the minimum
        let mut raw = vec![0x03, 12, 19, 0];
        raw.extend_from_slice(&[0u8; 15]);
        assert!(DevicePathRecord::parse(&raw).is_err());
    }
}
