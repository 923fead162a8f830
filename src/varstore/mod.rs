//! Firmware variable stores, and the boot manager variables kept in them.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::guid::{EfiGuid, EFI_GLOBAL_VARIABLE_GUID};
use crate::loadopt::LoadOption;

pub mod edk2;

pub use edk2::Volume;

/// Somewhere firmware variables can be read from and written to.
pub trait VariableStore {
    fn read_variable(&self, guid: &EfiGuid, name: &str) -> Result<Vec<u8>>;
    fn write_variable(&mut self, guid: &EfiGuid, name: &str, data: &[u8])
        -> Result<()>;
    /// Names of the variables currently present, in store order.
    fn variable_names(&self) -> Vec<(EfiGuid, String)>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    vars:  HashMap<(EfiGuid, String), Vec<u8>>,
    order: Vec<(EfiGuid, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariableStore for MemoryStore {
    fn read_variable(&self, guid: &EfiGuid, name: &str) -> Result<Vec<u8>> {
        self.vars
            .get(&(*guid, name.to_string()))
            .cloned()
            .ok_or_else(|| Error::VariableNotFound(format!("{}-{}", name, guid)))
    }

    fn write_variable(&mut self, guid: &EfiGuid, name: &str, data: &[u8])
        -> Result<()>
    {
        let key = (*guid, name.to_string());
        if self.vars.insert(key.clone(), data.to_vec()).is_none() {
            self.order.push(key);
        }
        Ok(())
    }

    fn variable_names(&self) -> Vec<(EfiGuid, String)> {
        self.order.clone()
    }
}

pub fn boot_variable_name(slot: u16) -> String {
    format!("Boot{:04X}", slot)
}

/// The slot number of a `BootXXXX` name. Exactly four hex digits follow
/// the prefix.
pub fn boot_slot(name: &str) -> Option<u16> {
    let digits = name.strip_prefix("Boot")?;
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

pub fn read_load_option<S>(store: &S, slot: u16) -> Result<LoadOption>
where
    S: VariableStore + ?Sized,
{
    let data = store.read_variable(&EFI_GLOBAL_VARIABLE_GUID,
        &boot_variable_name(slot))?;
    LoadOption::parse(&data)
}

pub fn write_load_option<S>(store: &mut S, slot: u16, option: &LoadOption)
    -> Result<()>
where
    S: VariableStore + ?Sized,
{
    let data = option.format()?;
    store.write_variable(&EFI_GLOBAL_VARIABLE_GUID, &boot_variable_name(slot),
        &data)
}

fn read_u16_array<S>(store: &S, name: &str) -> Option<Vec<u16>>
where
    S: VariableStore + ?Sized,
{
    let data = store.read_variable(&EFI_GLOBAL_VARIABLE_GUID, name).ok()?;
    if data.len() < 2 {
        return None;
    }
    Some(data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

fn write_u16_array<S>(store: &mut S, name: &str, values: &[u16]) -> Result<()>
where
    S: VariableStore + ?Sized,
{
    let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    store.write_variable(&EFI_GLOBAL_VARIABLE_GUID, name, &data)
}

pub fn boot_order<S>(store: &S) -> Option<Vec<u16>>
where
    S: VariableStore + ?Sized,
{
    read_u16_array(store, "BootOrder")
}

pub fn set_boot_order<S>(store: &mut S, order: &[u16]) -> Result<()>
where
    S: VariableStore + ?Sized,
{
    write_u16_array(store, "BootOrder", order)
}

pub fn boot_next<S>(store: &S) -> Option<u16>
where
    S: VariableStore + ?Sized,
{
    read_u16_array(store, "BootNext").and_then(|v| v.first().copied())
}

pub fn set_boot_next<S>(store: &mut S, slot: u16) -> Result<()>
where
    S: VariableStore + ?Sized,
{
    write_u16_array(store, "BootNext", &[slot])
}

#[derive(Debug, Clone, Serialize)]
pub struct BootEntry {
    pub slot:   u16,
    pub name:   String,
    pub option: LoadOption,
}

/// Every `BootXXXX` variable under the global GUID, by ascending slot.
/// Entries that do not parse are logged and left out.
pub fn boot_entries<S>(store: &S) -> Vec<BootEntry>
where
    S: VariableStore + ?Sized,
{
    let mut slots: Vec<(u16, String)> = store
        .variable_names()
        .into_iter()
        .filter(|(guid, _)| *guid == EFI_GLOBAL_VARIABLE_GUID)
        .filter_map(|(_, name)| boot_slot(&name).map(|s| (s, name)))
        .collect();
    slots.sort();
    slots.dedup();

    slots
        .into_iter()
        .filter_map(|(slot, name)| match store
            .read_variable(&EFI_GLOBAL_VARIABLE_GUID, &name)
            .and_then(|data| LoadOption::parse(&data))
        {
            Ok(option) => Some(BootEntry { slot, name, option }),
            Err(e) => {
                log::warn!("{}: {}", name, e);
                None
            }
        })
        .collect()
}
