//! Decoding and encoding of UEFI device paths and load options.
//!
//! The codec works on plain byte buffers: a `BootXXXX` variable goes in and
//! a [`LoadOption`] with its typed [`DevicePathRecord`] list comes out, and
//! the other way round. [`varstore`] supplies the variables.

#[macro_use]
extern crate lazy_static;

pub mod devpath;
pub mod error;
pub mod guid;
pub mod loadopt;
pub mod primitive;
pub mod ucs2;
pub mod varstore;

pub use devpath::{
    decode_record, device_path_to_text, encode_record, DevicePathList,
    DevicePathRecord,
};
pub use error::{Error, Result};
pub use guid::{resolve_guid, EfiGuid, EFI_GLOBAL_VARIABLE_GUID};
pub use loadopt::{BootTarget, LoadOption, LoadOptionLayout};
pub use varstore::{MemoryStore, VariableStore};
