// OGG transport layer
//
// OGG Page Header (27 bytes):
// - Capture Pattern: "OggS" (4 bytes)
// - Version: 0 (1 byte)
// - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
// - Granule Position (8 bytes)
// - Bitstream Serial Number (4 bytes)
// - Page Sequence Number (4 bytes)
// - CRC Checksum (4 bytes)
// - Number of Page Segments (1 byte)
// - Segment Table (variable)
//
// Packets are reassembled from the lacing values of the segment table: a
// lacing value below 255 terminates the current packet.

pub mod crc;
pub mod page;
pub mod stream;

use crate::error::Result;

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};

pub use page::Page;
pub use stream::OggStream;

/// OGG capture pattern
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";

pub const OGG_HEADER_TYPE_CONTINUATION: u8 = 0x01;
pub const OGG_HEADER_TYPE_BOS: u8 = 0x02;
pub const OGG_HEADER_TYPE_EOS: u8 = 0x04;

/// Ordered, zero-based sequence of logical packets
pub trait PacketStore {
    /// Bytes of packet `index`, empty when out of range
    fn packet(&self, index: usize) -> Result<Vec<u8>>;

    /// Replace packet `index`; takes effect on [`PacketStore::save`]
    fn set_packet(&mut self, index: usize, data: Vec<u8>);

    /// Persist all pending packet replacements
    ///
    /// Pending replacements are consumed whether or not this succeeds.
    fn save(&mut self) -> Result<()>;

    /// Drop pending replacements without persisting them
    fn discard(&mut self);

    /// Total byte length of the underlying stream
    fn length(&self) -> u64;
}

/// Seekable read/write storage that can be shrunk after a rewrite
pub trait Storage: Read + Write + Seek {
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl Storage for File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

impl Storage for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().truncate(len as usize);
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        (**self).truncate(len)
    }
}
