// Metadata chain scanner
//
// Two header layouts exist for FLAC in OGG:
// - FLAC 1.1.0 & 1.1.1: packet 0 is the bare "fLaC" marker and every metadata
//   block follows in its own packet.
// - FLAC 1.1.2+ (https://xiph.org/flac/ogg_mapping.html): packet 0 starts with
//   a 13-byte identification preamble followed by the STREAMINFO block.
//
// Identification preamble:
// <8>  0x7F packet type
// <32> "FLAC"
// <8>  mapping major version (1)
// <8>  mapping minor version (0)
// <16> number of header packets, big-endian
// <32> "fLaC"

use crate::error::{Error, Result};
use crate::flac::block::{Block, BlockType, FLAC_SIGNATURE};
use crate::ogg::PacketStore;

use std::ops::Range;

use log::{info, trace};
use serde::Serialize;

pub const OGG_FLAC_PACKET_TYPE: u8 = 0x7F;
pub const OGG_FLAC_HEADER_SIGNATURE: &[u8; 4] = b"FLAC";
pub const OGG_FLAC_PREAMBLE_SIZE: usize = 13;
pub const OGG_FLAC_MAPPING_MAJOR_VERSION: u8 = 1;
pub const OGG_FLAC_MAPPING_MINOR_VERSION: u8 = 0;

/// Where the metadata chain starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderLayout {
    /// Packet 0 is the bare "fLaC" marker, the chain starts in packet 1
    Native,
    /// Packet 0 carries the mapping preamble and the start of the chain
    SelfContained,
}

/// Facts derived from one pass over the metadata chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// STREAMINFO block body
    pub stream_info: Vec<u8>,
    /// VORBIS_COMMENT block body, empty without a comment
    pub comment: Vec<u8>,
    pub has_comment: bool,
    /// Packet carrying the VORBIS_COMMENT block
    pub comment_packet: usize,
    /// Header and body of the VORBIS_COMMENT block within its packet
    pub comment_range: Range<usize>,
    /// Bytes consumed by the metadata chain
    pub stream_start: u64,
    /// Stream length minus `stream_start`
    pub stream_length: u64,
    pub layout: Option<HeaderLayout>,
    pub scanned: bool,
}

/// Walk the metadata chain of `store`
///
/// Structural problems are reported as [`Error::Flac`]; only failures of the
/// store itself come back as other variants.
pub fn scan<P: PacketStore + ?Sized>(store: &P) -> Result<ScanResult> {
    let mut index = 0;
    let mut packet = store.packet(index)?;
    if packet.is_empty() {
        return Err(Error::Flac("Stream has no packets"));
    }

    let (layout, mut cursor) = if packet.starts_with(FLAC_SIGNATURE) {
        index += 1;
        packet = store.packet(index)?;
        (HeaderLayout::Native, 0)
    } else {
        check_preamble(&packet)?;
        (HeaderLayout::SelfContained, OGG_FLAC_PREAMBLE_SIZE)
    };

    let mut result = ScanResult {
        layout: Some(layout),
        ..ScanResult::default()
    };

    // The self-contained preamble is part of the header data
    let mut overhead = cursor as u64;

    let first = Block::read(&packet, cursor)?;
    if first.header.block_type != BlockType::StreamInfo {
        return Err(Error::Flac("First metadata block is not STREAMINFO"));
    }

    if first.body.is_empty() {
        return Err(Error::Flac("STREAMINFO block is empty"));
    }

    result.stream_info = first.body.to_vec();
    overhead += first.header.framed_len();
    cursor = first.end;
    let mut last_block = first.header.is_last;

    while !last_block {
        if cursor >= packet.len() {
            index += 1;
            packet = store.packet(index)?;
            cursor = 0;
        }

        let block = Block::read(&packet, cursor)?;
        overhead += block.header.framed_len();
        last_block = block.header.is_last;

        match block.header.block_type {
            BlockType::Padding => trace!("Padding found in packet {}", index),
            BlockType::VorbisComment => {
                trace!("Vorbis comment found in packet {}", index);
                result.comment = block.body.to_vec();
                result.has_comment = true;
                result.comment_packet = index;
                result.comment_range = block.start..block.end;
            }
            BlockType::Picture | BlockType::Unknown(_) => {
                info!("Skipping unknown metadata block (type {})", block.header.block_type.to_byte());
            }
            _ => {}
        }

        cursor = block.end;
    }

    result.stream_start = overhead;
    result.stream_length = store.length().saturating_sub(overhead);
    result.scanned = true;

    Ok(result)
}

fn check_preamble(packet: &[u8]) -> Result<()> {
    if packet.len() < OGG_FLAC_PREAMBLE_SIZE {
        return Err(Error::Flac("Ogg FLAC identification header is too short"));
    }

    if packet[0] != OGG_FLAC_PACKET_TYPE {
        return Err(Error::Flac("Packet 0 is not an Ogg FLAC identification header"));
    }

    if &packet[1..5] != OGG_FLAC_HEADER_SIGNATURE {
        return Err(Error::Flac("Ogg FLAC identification header is missing \"FLAC\""));
    }

    if packet[5] != OGG_FLAC_MAPPING_MAJOR_VERSION && packet[6] != OGG_FLAC_MAPPING_MINOR_VERSION {
        return Err(Error::Flac("Unsupported Ogg FLAC mapping version"));
    }

    if &packet[9..13] != FLAC_SIGNATURE {
        return Err(Error::Flac("Ogg FLAC identification header is missing \"fLaC\""));
    }

    Ok(())
}
