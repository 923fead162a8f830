//! The uefi-edk2 NV variable store firmware volume, as kept by OVMF and
//! bhyve guests.

use binrw::helpers::{until, until_eof, until_exclusive};
use binrw::io::{Cursor, SeekFrom};
use binrw::{binrw, BinReaderExt, BinWrite};

use super::VariableStore;
use crate::error::{Error, Result};
use crate::guid::EfiGuid;
use crate::ucs2::{self, encode_ucs2};

// The uefi-edk2 nvram firmware volume is divided into sections as follows:
//
//  0x00000 - 0x0dfff     NV_VARIABLE_STORE (Firmware volume)
//  0x0e000 - 0x0efff     NV_EVENT_LOG
//  0x0f000 - 0x0ffff     NV_FTW_WORKING (Fault-tolerant-write)
//  0x10000 - 0x1ffff     NV_FTW_SPARE
//
// This holds for firmware built with an FD_SIZE of 1024 or 2048.

const NV_EVENT_LOG: u64     = 0xe000;
const NV_EVENT_LOG_LEN: u64 = 0x1000;
const NV_FTW_WORKING: u64   = 0xf000;

const FVH_SIGNATURE: u32 = 0x4856_465f; // "_FVH"

const EFI_SYSTEM_NV_DATA_FV_GUID: EfiGuid = EfiGuid {
    data1: 0xfff1_2b8d,
    data2: 0x7696,
    data3: 0x4c8b,
    data4: [0xa9, 0x85, 0x27, 0x47, 0x07, 0x5b, 0x4f, 0x50],
};

const EFI_AUTHENTICATED_VARIABLE_GUID: EfiGuid = EfiGuid {
    data1: 0xaaf3_2c78,
    data2: 0x947b,
    data3: 0x439a,
    data4: [0xa1, 0x80, 0x2e, 0x14, 0x4e, 0xc3, 0x77, 0x92],
};

const EFI_FAULT_TOLERANT_WORKING_BLOCK_HEADER: EfiGuid = EfiGuid {
    data1: 0x9e58_292b,
    data2: 0x7c68,
    data3: 0x497d,
    data4: [0xa0, 0xce, 0x65, 0x00, 0xfd, 0x9f, 0x1b, 0x95],
};

const VARIABLE_DATA: u16 = 0x55aa;

const VAR_STORE_FORMATTED: u8 = 0x5a;
const VAR_STORE_HEALTHY: u8   = 0xfe;

pub const VAR_ADDED: u8 = 0x3f;

pub const EFI_VARIABLE_NON_VOLATILE: u32       = 0x0000_0001;
pub const EFI_VARIABLE_BOOTSERVICE_ACCESS: u32 = 0x0000_0002;
pub const EFI_VARIABLE_RUNTIME_ACCESS: u32     = 0x0000_0004;

const STORE_HEADER_LEN: usize = 28;
const VARIABLE_HEADER_LEN: usize = 60;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
pub struct Volume {
    #[br(assert(zero_vector == 0))]
    zero_vector:    u128,
    #[br(assert(guid == EFI_SYSTEM_NV_DATA_FV_GUID,
        "unexpected firmware volume GUID {}", guid))]
    guid:           EfiGuid,
    pub volsize:    u64,
    #[br(assert(signature == FVH_SIGNATURE))]
    signature:      u32,
    attributes:     u32,
    headerlen:      u16,
    checksum:       u16,
    // Extended headers are not supported
    #[br(assert(ext_hdr_offset == 0))]
    ext_hdr_offset: u16,
    #[br(assert(_rsvd1 == 0))]
    _rsvd1:         u8,
    #[br(assert(revision == 2))]
    revision:       u8,
    #[br(parse_with = until(|b: &BlockMapEntry| b.num == 0 && b.len == 0))]
    maps:           Vec<BlockMapEntry>,
    header:         VariableStoreHeader,
    #[br(parse_with = until_exclusive(|v: &AuthVariable|
        v.startid != VARIABLE_DATA))]
    vars:           Vec<AuthVariable>,

    // The gap up to the event log is erased flash (0xff) and is not kept.
    #[brw(seek_before(SeekFrom::Start(NV_EVENT_LOG)))]
    #[br(count = NV_EVENT_LOG_LEN)]
    eventlog:       Vec<u8>,

    #[brw(seek_before(SeekFrom::Start(NV_FTW_WORKING)))]
    ftw:            FtwBlockHeader,
    #[br(parse_with = until_eof)]
    ftwdata:        Vec<u8>,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
struct VariableStoreHeader {
    // uefi-edk2 ships an authenticated variable store
    #[br(assert(guid == EFI_AUTHENTICATED_VARIABLE_GUID,
        "unexpected variable store GUID {}", guid))]
    guid:   EfiGuid,
    size:   u32,
    #[br(assert(format == VAR_STORE_FORMATTED))]
    format: u8,
    #[br(assert(state == VAR_STORE_HEALTHY))]
    state:  u8,
    _rsvd1: u16,
    _rsvd2: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
struct FtwBlockHeader {
    #[br(assert(guid == EFI_FAULT_TOLERANT_WORKING_BLOCK_HEADER,
        "unexpected FTW header GUID {}", guid))]
    guid:      EfiGuid,
    crc32:     u32,
    flags:     u32,
    queuesize: u64,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy)]
struct BlockMapEntry {
    num: u32,
    len: u32,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Default)]
struct EfiTime {
    year:     u16,
    month:    u8,
    day:      u8,
    hour:     u8,
    min:      u8,
    sec:      u8,
    _pad1:    u8,
    nanosec:  u32,
    tz:       u16,
    daylight: u8,
    _pad2:    u8,
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
pub struct AuthVariable {
    startid:         u16,
    pub state:       u8,
    _rsvd1:          u8,
    pub attributes:  u32,
    count:           u64,
    timestamp:       EfiTime,
    pubkeyindex:     u32,
    namelen:         u32,
    datalen:         u32,
    pub guid:        EfiGuid,
    #[br(if(startid == VARIABLE_DATA),
        parse_with = ucs2::parse_sized, args(namelen))]
    #[bw(write_with = ucs2::write_terminated)]
    pub name:        String,
    #[br(if(startid == VARIABLE_DATA), count = datalen)]
    #[brw(align_after = 4)]
    pub data:        Vec<u8>,
}

impl AuthVariable {
    fn new(guid: &EfiGuid, name: &str, data: &[u8]) -> Self {
        AuthVariable {
            startid:     VARIABLE_DATA,
            state:       VAR_ADDED,
            _rsvd1:      0,
            attributes:  EFI_VARIABLE_NON_VOLATILE
                | EFI_VARIABLE_BOOTSERVICE_ACCESS
                | EFI_VARIABLE_RUNTIME_ACCESS,
            count:       0,
            timestamp:   EfiTime::default(),
            pubkeyindex: 0,
            namelen:     encode_ucs2(name, true).len() as u32,
            datalen:     data.len() as u32,
            guid:        *guid,
            name:        name.to_string(),
            data:        data.to_vec(),
        }
    }

    pub fn is_added(&self) -> bool {
        self.state == VAR_ADDED
    }

    /// Bytes taken in the store, including alignment padding.
    fn stored_len(&self) -> usize {
        let len = VARIABLE_HEADER_LEN + self.namelen as usize
            + self.datalen as usize;
        (len + 3) & !3
    }
}

impl Volume {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        Cursor::new(buf).read_le().map_err(Error::Binary)
    }

    /// Serialize the volume. Space between the last variable and the event
    /// log is written as erased flash.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut c = Cursor::new(vec![0xffu8; NV_EVENT_LOG as usize]);
        self.write_le(&mut c).map_err(Error::Binary)?;
        Ok(c.into_inner())
    }

    /// Every variable record in the store, including deleted ones.
    pub fn variables(&self) -> &[AuthVariable] {
        &self.vars
    }

    fn find(&self, guid: &EfiGuid, name: &str) -> Option<&AuthVariable> {
        self.vars
            .iter()
            .find(|v| v.is_added() && v.guid == *guid && v.name == name)
    }

    fn capacity(&self) -> usize {
        (self.header.size as usize).saturating_sub(STORE_HEADER_LEN)
    }
}

impl VariableStore for Volume {
    fn read_variable(&self, guid: &EfiGuid, name: &str) -> Result<Vec<u8>> {
        self.find(guid, name)
            .map(|v| v.data.clone())
            .ok_or_else(|| Error::VariableNotFound(format!("{}-{}", name, guid)))
    }

    /// Replaces every existing record of the variable, whatever its state.
    fn write_variable(&mut self, guid: &EfiGuid, name: &str, data: &[u8])
        -> Result<()>
    {
        let var = AuthVariable::new(guid, name, data);
        let used: usize = self.vars
            .iter()
            .filter(|v| v.guid != *guid || v.name != name)
            .map(AuthVariable::stored_len)
            .sum();
        let needed = used + var.stored_len();
        if needed > self.capacity() {
            return Err(Error::RecordTooLarge(needed));
        }

        log::debug!("writing {}-{}: {} bytes", name, guid, data.len());
        self.vars.retain(|v| v.guid != *guid || v.name != name);
        self.vars.push(var);
        Ok(())
    }

    fn variable_names(&self) -> Vec<(EfiGuid, String)> {
        self.vars
            .iter()
            .filter(|v| v.is_added())
            .map(|v| (v.guid, v.name.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::EFI_GLOBAL_VARIABLE_GUID;

    fn blank() -> Volume {
        Volume {
            zero_vector:    0,
            guid:           EFI_SYSTEM_NV_DATA_FV_GUID,
            volsize:        0x20000,
            signature:      FVH_SIGNATURE,
            attributes:     0x0004_feff,
            headerlen:      0x48,
            checksum:       0,
            ext_hdr_offset: 0,
            _rsvd1:         0,
            revision:       2,
            maps:           vec![
                BlockMapEntry { num: 0x20, len: 0x1000 },
                BlockMapEntry { num: 0, len: 0 },
            ],
            header:         VariableStoreHeader {
                guid:   EFI_AUTHENTICATED_VARIABLE_GUID,
                size:   (NV_EVENT_LOG - 0x48) as u32,
                format: VAR_STORE_FORMATTED,
                state:  VAR_STORE_HEALTHY,
                _rsvd1: 0,
                _rsvd2: 0,
            },
            vars:           Vec::new(),
            eventlog:       vec![0xff; NV_EVENT_LOG_LEN as usize],
            ftw:            FtwBlockHeader {
                guid:      EFI_FAULT_TOLERANT_WORKING_BLOCK_HEADER,
                crc32:     0,
                flags:     0,
                queuesize: 0xfe0,
            },
            ftwdata:        vec![0xff; 64],
        }
    }

    #[test]
    fn write_then_read_back() {
        let mut fv = blank();
        fv.write_variable(&EFI_GLOBAL_VARIABLE_GUID, "BootNext", &[3, 0])
            .unwrap();
        fv.write_variable(&EFI_GLOBAL_VARIABLE_GUID, "Boot0003", &[1, 2, 3])
            .unwrap();

        let raw = fv.to_bytes().unwrap();
        assert_eq!(raw.len(), 0xf000 + 32 + 64);
        assert_eq!(&raw[0x28..0x2c], b"_FVH");
        // erased flash after the last variable
        assert_eq!(raw[0xdfff], 0xff);

        let back = Volume::parse(&raw).unwrap();
        assert_eq!(back.variables().len(), 2);
        assert_eq!(back.read_variable(&EFI_GLOBAL_VARIABLE_GUID, "BootNext")
            .unwrap(), vec![3, 0]);
        assert_eq!(back.read_variable(&EFI_GLOBAL_VARIABLE_GUID, "Boot0003")
            .unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn rewrite_replaces() {
        let mut fv = blank();
        fv.write_variable(&EFI_GLOBAL_VARIABLE_GUID, "BootNext", &[1, 0])
            .unwrap();
        fv.write_variable(&EFI_GLOBAL_VARIABLE_GUID, "BootNext", &[2, 0])
            .unwrap();
        assert_eq!(fv.variables().len(), 1);
        assert_eq!(fv.read_variable(&EFI_GLOBAL_VARIABLE_GUID, "BootNext")
            .unwrap(), vec![2, 0]);
    }

    #[test]
    fn deleted_variables_are_hidden() {
        let mut fv = blank();
        fv.write_variable(&EFI_GLOBAL_VARIABLE_GUID, "Timeout", &[5, 0])
            .unwrap();
        // VAR_ADDED & VAR_DELETED
        fv.vars[0].state = 0x3d;
        assert!(matches!(
            fv.read_variable(&EFI_GLOBAL_VARIABLE_GUID, "Timeout"),
            Err(Error::VariableNotFound(_))
        ));
        assert!(fv.variable_names().is_empty());
    }

    #[test]
    fn store_full() {
        let mut fv = blank();
        let big = vec![0u8; 0xe000];
        assert!(matches!(
            fv.write_variable(&EFI_GLOBAL_VARIABLE_GUID, "Big", &big),
            Err(Error::RecordTooLarge(_))
        ));
        assert!(fv.variables().is_empty());
    }

    #[test]
    fn rejects_foreign_image() {
        let mut raw = blank().to_bytes().unwrap();
        raw[0x28] = b'X';
        assert!(Volume::parse(&raw).is_err());
        assert!(Volume::parse(&[0u8; 16]).is_err());
    }
}
