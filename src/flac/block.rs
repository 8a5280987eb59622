// FLAC metadata block headers
//
// Block header layout:
// <1>  Last-metadata-block flag
// <7>  BLOCK_TYPE
// <24> Length of the block body that follows, big-endian

use crate::error::{Error, Result};

use byteorder::{BigEndian, ByteOrder};

/// Native FLAC stream marker
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";

/// Largest body length expressible in a block header
pub const MAX_BLOCK_LENGTH: u32 = 0x00FF_FFFF;

/// FLAC metadata block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    /// Reserved or future block types, carried through untouched
    Unknown(u8),
}

impl BlockType {
    pub fn from_byte(byte: u8) -> Self {
        match byte & 0x7F {
            0 => BlockType::StreamInfo,
            1 => BlockType::Padding,
            2 => BlockType::Application,
            3 => BlockType::SeekTable,
            4 => BlockType::VorbisComment,
            5 => BlockType::CueSheet,
            6 => BlockType::Picture,
            other => BlockType::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            BlockType::StreamInfo => 0,
            BlockType::Padding => 1,
            BlockType::Application => 2,
            BlockType::SeekTable => 3,
            BlockType::VorbisComment => 4,
            BlockType::CueSheet => 5,
            BlockType::Picture => 6,
            BlockType::Unknown(byte) => byte & 0x7F,
        }
    }
}

/// FLAC metadata block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub is_last: bool,
    pub block_type: BlockType,
    pub length: u32,
}

impl BlockHeader {
    pub const SIZE: usize = 4;

    /// Decode a header from the first four bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::Flac("Metadata block header is truncated"));
        }

        Ok(BlockHeader {
            is_last: (bytes[0] & 0x80) != 0,
            block_type: BlockType::from_byte(bytes[0]),
            length: BigEndian::read_u24(&bytes[1..4]),
        })
    }

    /// Encode the header, failing if the length does not fit in 24 bits
    pub fn to_bytes(&self) -> Result<[u8; 4]> {
        if self.length > MAX_BLOCK_LENGTH {
            return Err(Error::TooMuchData);
        }

        let mut bytes = self.length.to_be_bytes();
        bytes[0] = self.block_type.to_byte();
        if self.is_last {
            bytes[0] |= 0x80;
        }

        Ok(bytes)
    }

    /// Header plus body size
    pub fn framed_len(&self) -> u64 {
        Self::SIZE as u64 + u64::from(self.length)
    }
}

/// A metadata block borrowed from the packet that carries it
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    pub header: BlockHeader,
    pub body: &'a [u8],
    /// Offset of the header within the packet
    pub start: usize,
    /// Offset just past the body, where the next block would begin
    pub end: usize,
}

impl<'a> Block<'a> {
    /// Decode one block from `packet` starting at `cursor`
    pub fn read(packet: &'a [u8], cursor: usize) -> Result<Self> {
        let remaining = packet
            .get(cursor..)
            .ok_or(Error::Flac("Metadata block cursor is past the packet end"))?;

        let header = BlockHeader::parse(remaining)?;

        let body_start = cursor + BlockHeader::SIZE;
        let end = body_start + header.length as usize;
        if end > packet.len() {
            return Err(Error::Flac("Metadata block body exceeds its packet"));
        }

        Ok(Block {
            header,
            body: &packet[body_start..end],
            start: cursor,
            end,
        })
    }
}
