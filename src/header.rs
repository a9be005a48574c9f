use std::io::{self, Read, Write};
use thiserror::Error;

use crate::synchsafe;

pub const MAGIC: &[u8; 3] = b"ID3";
/// Total on-disk header length: magic + version/flags + synchsafe size.
pub const HEADER_SIZE: usize = 10;
/// Bytes preceding the size field, carried through unmodified.
pub const PREFIX_SIZE: usize = 6;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Invalid tag identifier: expected \"ID3\", found {}", hex::encode_upper(.0))]
    InvalidMagic([u8; 3]),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The fixed 10-byte tag header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHeader {
    /// Magic, major version, revision and flags.  Opaque to this crate.
    pub prefix: [u8; PREFIX_SIZE],
    /// Declared size of everything after the header, in bytes.
    pub size: u32,
}

impl TagHeader {
    pub fn read<R: Read>(mut reader: R) -> Result<Self, HeaderError> {
        let mut raw = [0u8; HEADER_SIZE];
        reader.read_exact(&mut raw)?;

        let magic = [raw[0], raw[1], raw[2]];
        if &magic != MAGIC {
            return Err(HeaderError::InvalidMagic(magic));
        }

        let mut prefix = [0u8; PREFIX_SIZE];
        prefix.copy_from_slice(&raw[..PREFIX_SIZE]);
        let size = synchsafe::decode([raw[6], raw[7], raw[8], raw[9]]);
        Ok(Self { prefix, size })
    }

    /// Write the prefix followed by `size` in synchsafe form.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let size = synchsafe::encode(u64::from(self.size))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        writer.write_all(&self.prefix)?;
        writer.write_all(&size)?;
        Ok(())
    }

    /// Absolute offset of the first byte following the declared tag.
    pub fn content_offset(&self) -> u64 {
        HEADER_SIZE as u64 + u64::from(self.size)
    }
}
