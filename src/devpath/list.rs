//! Walking a buffer as a sequence of device path records.

use super::{
    encode_record, DevicePathRecord, EndKind, MediaRecord, DEVICE_TYPE_END,
    END_ENTIRE, END_ENTIRE_RECORD, HEADER_LEN,
};
use crate::error::{Error, Result};
use crate::primitive::read_u16le;

/// Outcome of a structural walk over a record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWalk {
    /// Records visited, the terminator included.
    pub records:    usize,
    /// Bytes consumed, the terminator included.
    pub size:       usize,
    /// An end-of-entire-list record was seen before `max_size` ran out.
    pub terminated: bool,
}

/// The length field of the record at the start of `buf`.
pub fn record_length(buf: &[u8]) -> Result<usize> {
    if buf.len() < HEADER_LEN {
        return Err(Error::TruncatedInput {
            needed:    HEADER_LEN,
            available: buf.len(),
        });
    }
    Ok(read_u16le(buf, 2)? as usize)
}

fn is_terminator(record: &[u8]) -> bool {
    record[0] == DEVICE_TYPE_END && record[1] == END_ENTIRE
}

/// Visit every record header in `buf[..max_size]` without decoding
/// payloads. Stops after the first end-of-entire-list record, or when
/// exactly `max_size` bytes have been consumed.
pub fn walk_list(buf: &[u8], max_size: usize) -> Result<ListWalk> {
    let mut walk = ListWalk { records: 0, size: 0, terminated: false };

    while walk.size < max_size {
        let offset = walk.size;
        let length = record_length(&buf[offset.min(buf.len())..])?;
        if length < HEADER_LEN {
            return Err(Error::BadRecordLength { offset, length });
        }
        let end = offset + length;
        if end > max_size || end > buf.len() {
            return Err(Error::TruncatedInput {
                needed:    end,
                available: max_size.min(buf.len()),
            });
        }

        walk.records += 1;
        walk.size = end;
        if is_terminator(&buf[offset..end]) {
            walk.terminated = true;
            break;
        }
    }
    Ok(walk)
}

pub fn count_records(buf: &[u8], max_size: usize) -> Result<usize> {
    Ok(walk_list(buf, max_size)?.records)
}

/// Size of the list in bytes. The walk has to use up `max_size` exactly,
/// unless the very first record is already the terminator.
pub fn total_size(buf: &[u8], max_size: usize) -> Result<usize> {
    let walk = walk_list(buf, max_size)?;
    if walk.terminated && walk.records == 1 {
        return Ok(walk.size);
    }
    if walk.size != max_size {
        return Err(Error::LengthMismatch {
            declared: max_size,
            actual:   walk.size,
        });
    }
    Ok(walk.size)
}

/// Decode the records of `buf[..max_size]`. Records the codec rejects are
/// logged and skipped using their declared length; the terminator is
/// consumed and not returned.
pub fn parse_list(buf: &[u8], max_size: usize) -> Result<Vec<DevicePathRecord>> {
    let count = count_records(buf, max_size)?;
    let mut records = Vec::with_capacity(count);

    let mut offset = 0;
    for _ in 0..count {
        let length = record_length(&buf[offset..])?;
        let raw = &buf[offset..offset + length];
        offset += length;

        match DevicePathRecord::parse(raw) {
            Ok(DevicePathRecord::End(EndKind::Entire)) => break,
            Ok(r) => records.push(r),
            Err(e @ Error::UnsupportedRecord { .. }) => {
                log::debug!("skipping record at {:#x}: {}", offset - length, e);
            }
            Err(e) => {
                log::warn!("skipping malformed record at {:#x}: {}",
                    offset - length, e);
            }
        }
    }
    Ok(records)
}

/// Encode `records` followed by the end-of-entire-list terminator. An
/// explicit terminator inside `records` is not written twice.
pub fn format_list(records: &[DevicePathRecord]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for r in records.iter().filter(|r| !r.is_end_of_list()) {
        out.extend_from_slice(&encode_record(r)?);
    }
    out.extend_from_slice(&END_ENTIRE_RECORD);
    Ok(out)
}

/// Path of the first file node in the first instance.
pub fn find_file_path(records: &[DevicePathRecord]) -> Option<&str> {
    records
        .iter()
        .take_while(|r| !r.is_end())
        .find_map(|r| match r {
            DevicePathRecord::Media(MediaRecord::File(f)) => Some(f.path.as_str()),
            _ => None,
        })
}

/// Split a list at its end-of-instance records.
pub fn split_instances(records: &[DevicePathRecord]) -> Vec<&[DevicePathRecord]> {
    let end = records
        .iter()
        .position(|r| r.is_end_of_list())
        .unwrap_or(records.len());
    let records = &records[..end];
    if records.is_empty() {
        return Vec::new();
    }
    records
        .split(|r| matches!(r, DevicePathRecord::End(EndKind::Instance)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devpath::hardware::{HardwareRecord, Pci};
    use crate::devpath::media::FilePath;

    fn pci(device: u8) -> DevicePathRecord {
        DevicePathRecord::Hardware(HardwareRecord::Pci(Pci {
            function: 0,
            device,
        }))
    }

    fn file(path: &str) -> DevicePathRecord {
        DevicePathRecord::Media(MediaRecord::File(FilePath {
            path: path.to_string(),
        }))
    }

    #[test]
    fn record_length_needs_header() {
        assert_eq!(record_length(&[1, 1, 6, 0]).unwrap(), 6);
        assert!(matches!(record_length(&[1, 1, 6]),
            Err(Error::TruncatedInput { needed: 4, available: 3 })));
    }

    #[test]
    fn total_size_matches_formatted_length() {
        let records = vec![pci(0x1f), file("\\EFI\\fedora\\shimx64.efi")];
        let raw = format_list(&records).unwrap();
        assert_eq!(total_size(&raw, raw.len()).unwrap(), raw.len());
        assert_eq!(count_records(&raw, raw.len()).unwrap(), 3);
        assert_eq!(parse_list(&raw, raw.len()).unwrap(), records);
    }

    #[test]
    fn walk_stops_at_terminator() {
        let mut raw = format_list(&[pci(1)]).unwrap();
        raw.extend_from_slice(&[0xaa; 8]);
        let walk = walk_list(&raw, raw.len()).unwrap();
        assert_eq!(walk, ListWalk { records: 2, size: 10, terminated: true });
        assert!(total_size(&raw, raw.len()).is_err());
    }

    #[test]
    fn lone_terminator() {
        let raw = [0x7f, 0xff, 0x04, 0x00, 0xde, 0xad];
        assert_eq!(total_size(&raw, 64).unwrap(), 4);
        assert!(parse_list(&raw, raw.len()).unwrap().is_empty());
    }

    #[test]
    fn unterminated_list_fills_max_size() {
        let raw = encode_record(&pci(2)).unwrap();
        let walk = walk_list(&raw, raw.len()).unwrap();
        assert!(!walk.terminated);
        assert_eq!(total_size(&raw, raw.len()).unwrap(), 6);
        assert_eq!(parse_list(&raw, raw.len()).unwrap(), vec![pci(2)]);
    }

    #[test]
    fn structural_errors() {
        // length below the header
        let raw = [0x01, 0x01, 0x02, 0x00, 0x7f, 0xff, 0x04, 0x00];
        assert!(matches!(walk_list(&raw, raw.len()),
            Err(Error::BadRecordLength { offset: 0, length: 2 })));

        // record crossing max_size
        let raw = format_list(&[pci(3)]).unwrap();
        assert!(matches!(count_records(&raw, 5),
            Err(Error::TruncatedInput { needed: 6, available: 5 })));

        // max_size larger than the buffer
        assert!(count_records(&raw[..6], 10).is_err());
        assert_eq!(count_records(&raw, 0).unwrap(), 0);
    }

    #[test]
    fn unsupported_record_is_skipped() {
        let mut raw = encode_record(&pci(1)).unwrap();
        raw.extend_from_slice(&[0x06, 0x01, 0x08, 0x00, 1, 2, 3, 4]);
        raw.extend_from_slice(&encode_record(&file("\\x.efi")).unwrap());
        raw.extend_from_slice(&END_ENTIRE_RECORD);

        assert_eq!(count_records(&raw, raw.len()).unwrap(), 4);
        assert_eq!(parse_list(&raw, raw.len()).unwrap(),
            vec![pci(1), file("\\x.efi")]);
    }

    #[test]
    fn malformed_record_is_skipped() {
        // MMIO with a ten byte payload, too short for its layout
        let mut raw = vec![0x01, 0x03, 0x0e, 0x00];
        raw.extend_from_slice(&[0u8; 10]);
        raw.extend_from_slice(&encode_record(&pci(4)).unwrap());
        raw.extend_from_slice(&END_ENTIRE_RECORD);
        assert_eq!(parse_list(&raw, raw.len()).unwrap(), vec![pci(4)]);
    }

    #[test]
    fn format_does_not_double_terminate() {
        let raw = format_list(&[pci(1), DevicePathRecord::End(EndKind::Entire)])
            .unwrap();
        assert_eq!(raw.len(), 10);
        assert_eq!(format_list(&[]).unwrap(), END_ENTIRE_RECORD);
    }

    #[test]
    fn instances() {
        let records = vec![
            pci(1),
            file("\\a.efi"),
            DevicePathRecord::End(EndKind::Instance),
            pci(2),
            file("\\b.efi"),
        ];
        let parts = split_instances(&records);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1], &records[3..]);
        assert_eq!(find_file_path(&records), Some("\\a.efi"));
        assert_eq!(find_file_path(&records[2..]), None);
        assert!(split_instances(&[]).is_empty());

        // instance separators survive a list round trip
        let raw = format_list(&records).unwrap();
        assert_eq!(parse_list(&raw, raw.len()).unwrap(), records);
    }
}
