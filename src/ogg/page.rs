use crate::error::{Error, Result};
use crate::ogg::crc::crc32;
use crate::ogg::{
    OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION, OGG_HEADER_TYPE_EOS, OGG_SIGNATURE,
};

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

/// Most lacing values a single page can hold
pub const MAX_SEGMENTS: usize = 255;

/// OGG Page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub header_type: u8,
    pub granule_position: u64,
    pub bitstream_serial: u32,
    pub page_sequence: u32,
    pub crc: u32,
    pub segment_table: Vec<u8>,
    pub data: Vec<u8>,
}

impl Page {
    pub const HEADER_SIZE: usize = 27;

    /// Read one page, returning `None` on a clean end of stream
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut header = [0u8; Self::HEADER_SIZE];

        let mut filled = 0;
        while filled < header.len() {
            match reader.read(&mut header[filled..])? {
                0 if filled == 0 => return Ok(None),
                0 => return Err(Error::Ogg("Page header is truncated")),
                n => filled += n,
            }
        }

        if &header[0..4] != OGG_SIGNATURE {
            return Err(Error::Ogg("Page is missing a magic signature"));
        }

        let mut fields = &header[4..];
        if fields.read_u8()? != 0 {
            return Err(Error::Ogg("Invalid stream structure version (should always be 0)"));
        }

        let header_type = fields.read_u8()?;
        let granule_position = fields.read_u64::<LittleEndian>()?;
        let bitstream_serial = fields.read_u32::<LittleEndian>()?;
        let page_sequence = fields.read_u32::<LittleEndian>()?;
        let crc = fields.read_u32::<LittleEndian>()?;
        let segment_count = fields.read_u8()?;

        let mut segment_table = vec![0u8; segment_count as usize];
        reader
            .read_exact(&mut segment_table)
            .map_err(|_| Error::Ogg("Page segment table is truncated"))?;

        let data_size: usize = segment_table.iter().map(|&x| x as usize).sum();
        let mut data = vec![0u8; data_size];
        reader
            .read_exact(&mut data)
            .map_err(|_| Error::Ogg("Page data is truncated"))?;

        Ok(Some(Page {
            header_type,
            granule_position,
            bitstream_serial,
            page_sequence,
            crc,
            segment_table,
            data,
        }))
    }

    /// Total encoded size of the page
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.segment_table.len() + self.data.len()
    }

    /// Serialize the page with its current checksum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());

        bytes.extend_from_slice(OGG_SIGNATURE);
        bytes.push(0);
        bytes.push(self.header_type);
        bytes.extend_from_slice(&self.granule_position.to_le_bytes());
        bytes.extend_from_slice(&self.bitstream_serial.to_le_bytes());
        bytes.extend_from_slice(&self.page_sequence.to_le_bytes());
        bytes.extend_from_slice(&self.crc.to_le_bytes());
        bytes.push(self.segment_table.len() as u8);
        bytes.extend_from_slice(&self.segment_table);
        bytes.extend_from_slice(&self.data);

        bytes
    }

    /// Recompute the checksum over the page with a zeroed checksum field
    pub fn gen_crc(&mut self) {
        self.crc = 0;
        self.crc = crc32(&self.to_bytes());
    }

    pub fn is_continuation(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_CONTINUATION != 0
    }

    pub fn is_bos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_BOS != 0
    }

    pub fn is_eos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_EOS != 0
    }
}

/// Lacing values for a packet of `len` bytes
///
/// A packet whose length is a multiple of 255 ends with a zero lacing value.
pub fn lacing_values(len: usize) -> Vec<u8> {
    let mut table = vec![255u8; len / 255];
    table.push((len % 255) as u8);
    table
}

/// Split one packet into pages of at most [`MAX_SEGMENTS`] lacing values
///
/// The returned pages carry no sequence number or checksum yet. The last page
/// gets `granule_position`, earlier ones the "no packet ends here" marker.
pub fn paginate(packet: &[u8], serial: u32, granule_position: u64) -> Vec<Page> {
    let lacing = lacing_values(packet.len());
    let mut pages = Vec::new();
    let mut offset = 0;

    for (i, segments) in lacing.chunks(MAX_SEGMENTS).enumerate() {
        let size: usize = segments.iter().map(|&s| s as usize).sum();

        pages.push(Page {
            header_type: if i == 0 { 0 } else { OGG_HEADER_TYPE_CONTINUATION },
            granule_position: u64::MAX,
            bitstream_serial: serial,
            page_sequence: 0,
            crc: 0,
            segment_table: segments.to_vec(),
            data: packet[offset..offset + size].to_vec(),
        });

        offset += size;
    }

    if let Some(last) = pages.last_mut() {
        last.granule_position = granule_position;
    }

    pages
}
