use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input truncated: needed {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },
    #[error("length mismatch: declared {declared} bytes, found {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("device path record at offset {offset} has invalid length {length}")]
    BadRecordLength { offset: usize, length: usize },
    #[error("unsupported device path record {device_type:#04x}/{subtype:#04x}")]
    UnsupportedRecord { device_type: u8, subtype: u8 },
    #[error("encoded record is {0} bytes, larger than a length field can hold")]
    RecordTooLarge(usize),
    #[error("missing null terminator in {0}")]
    Unterminated(&'static str),
    #[error("{0} contains a null byte")]
    InteriorNul(&'static str),
    #[error("invalid GUID {0:?}")]
    InvalidGuid(String),
    #[error("variable {0} not found")]
    VariableNotFound(String),
    #[error("binary layout error")]
    Binary(#[source] binrw::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map a `binrw` failure onto the codec taxonomy. Running out of input
    /// is always reported as truncation, everything else is passed through.
    pub(crate) fn from_binrw(err: binrw::Error, needed: usize, available: usize)
        -> Self
    {
        if err.is_eof() {
            Error::TruncatedInput { needed, available }
        } else {
            Error::Binary(err)
        }
    }
}
