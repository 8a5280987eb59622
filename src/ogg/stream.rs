// In-memory OGG packet store
//
// The whole stream is held as parsed pages. Packets of the first logical
// bitstream are indexed by the pages they span; saving repaginates only the
// run of pages that carries replaced packets and renumbers what follows.

use crate::error::{Error, Result};
use crate::ogg::page::{paginate, Page};
use crate::ogg::{PacketStore, Storage, OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_EOS};

use std::collections::BTreeMap;
use std::io::SeekFrom;

use log::{debug, trace, warn};

/// Location of one packet inside the page list
#[derive(Debug, Clone)]
struct PacketSpan {
    /// Indices into `OggStream::pages`, in stream order
    pages: Vec<usize>,
    /// Offset of the packet inside the first page's data
    start: usize,
    /// End offset inside the last page's data
    end: usize,
}

impl PacketSpan {
    fn first_page(&self) -> usize {
        self.pages[0]
    }

    fn last_page(&self) -> usize {
        self.pages[self.pages.len() - 1]
    }
}

/// Packet store over an OGG physical stream
pub struct OggStream<S> {
    storage: S,
    pages: Vec<Page>,
    /// Bytes after the last parseable page, written back untouched
    trailer: Vec<u8>,
    serial: Option<u32>,
    packets: Vec<PacketSpan>,
    pending: BTreeMap<usize, Vec<u8>>,
    length: u64,
}

impl<S: Storage> OggStream<S> {
    /// Read and index every page of `storage`
    ///
    /// Only I/O failures are errors. Data that is not OGG at all yields a
    /// stream without packets.
    pub fn new(storage: S) -> Result<Self> {
        let mut stream = OggStream {
            storage,
            pages: Vec::new(),
            trailer: Vec::new(),
            serial: None,
            packets: Vec::new(),
            pending: BTreeMap::new(),
            length: 0,
        };

        stream.load()?;
        Ok(stream)
    }

    fn load(&mut self) -> Result<()> {
        self.storage.seek(SeekFrom::Start(0))?;

        let mut bytes = Vec::new();
        self.storage.read_to_end(&mut bytes)?;

        let (pages, trailer) = parse_pages(&bytes);
        self.length = bytes.len() as u64;
        self.set_pages(pages, trailer);

        Ok(())
    }

    fn set_pages(&mut self, pages: Vec<Page>, trailer: Vec<u8>) {
        self.serial = pages.first().map(|p| p.bitstream_serial);
        self.packets = index_packets(&pages, self.serial);
        self.pages = pages;
        self.trailer = trailer;
        self.pending.clear();

        trace!(
            "Indexed {} pages, {} packets, {} trailing bytes",
            self.pages.len(),
            self.packets.len(),
            self.trailer.len()
        );
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of complete packets in the logical bitstream
    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    /// Serial number of the logical bitstream being tracked
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    pub fn get_ref(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    fn packet_data(&self, span: &PacketSpan) -> Vec<u8> {
        let mut data = Vec::new();
        let last = span.pages.len() - 1;

        for (i, &index) in span.pages.iter().enumerate() {
            let page = &self.pages[index].data;
            let from = if i == 0 { span.start } else { 0 };
            let to = if i == last { span.end } else { page.len() };
            data.extend_from_slice(&page[from..to]);
        }

        data
    }

    /// Smallest packet range covering `first..=last` whose pages hold no other packet
    fn widen(&self, mut first: usize, mut last: usize) -> (usize, usize) {
        loop {
            if first > 0 && self.packets[first - 1].last_page() == self.packets[first].first_page() {
                first -= 1;
            } else if last + 1 < self.packets.len()
                && self.packets[last + 1].first_page() == self.packets[last].last_page()
            {
                last += 1;
            } else {
                return (first, last);
            }
        }
    }

    fn repaginate(&self, serial: u32, first: usize, last: usize) -> Vec<Page> {
        let lo_page = self.packets[first].first_page();
        let hi_page = self.packets[last].last_page();

        let mut rebuilt = Vec::new();
        for index in first..=last {
            let span = &self.packets[index];
            let granule = self.pages[span.last_page()].granule_position;

            match self.pending.get(&index) {
                Some(data) => rebuilt.extend(paginate(data, serial, granule)),
                None => rebuilt.extend(paginate(&self.packet_data(span), serial, granule)),
            }
        }

        if self.pages[lo_page].is_bos() {
            if let Some(page) = rebuilt.first_mut() {
                page.header_type |= OGG_HEADER_TYPE_BOS;
            }
        }
        if self.pages[hi_page].is_eos() {
            if let Some(page) = rebuilt.last_mut() {
                page.header_type |= OGG_HEADER_TYPE_EOS;
            }
        }

        let mut sequence = self.pages[lo_page].page_sequence;
        for page in &mut rebuilt {
            page.page_sequence = sequence;
            page.gen_crc();
            sequence = sequence.wrapping_add(1);
        }

        rebuilt
    }

    /// Repaginate pending packets and rewrite the storage
    fn write_pending(&mut self) -> Result<()> {
        let (Some((&lo, _)), Some((&hi, _))) = (self.pending.first_key_value(), self.pending.last_key_value()) else {
            return Ok(());
        };

        let serial = self.serial.ok_or(Error::Ogg("Stream has no pages"))?;
        if hi >= self.packets.len() {
            return Err(Error::Ogg("Replaced packet does not exist"));
        }

        let (first, last) = self.widen(lo, hi);
        let lo_page = self.packets[first].first_page();
        let hi_page = self.packets[last].last_page();

        let rebuilt = self.repaginate(serial, first, last);
        let replaced = (lo_page..=hi_page)
            .filter(|&i| self.pages[i].bitstream_serial == serial)
            .count();
        let shift = rebuilt.len() as i64 - replaced as i64;

        debug!(
            "Rewriting packets {}..={} as {} pages (was {})",
            first,
            last,
            rebuilt.len(),
            replaced
        );

        let mut output = Vec::with_capacity(self.pages.len() + rebuilt.len());
        output.extend_from_slice(&self.pages[..lo_page]);
        output.extend(
            self.pages[lo_page..=hi_page]
                .iter()
                .filter(|p| p.bitstream_serial != serial)
                .cloned(),
        );
        output.extend(rebuilt);

        for page in &self.pages[hi_page + 1..] {
            let mut page = page.clone();
            if shift != 0 && page.bitstream_serial == serial {
                page.page_sequence = (i64::from(page.page_sequence) + shift) as u32;
                page.gen_crc();
            }
            output.push(page);
        }

        let mut bytes = Vec::with_capacity(output.iter().map(Page::size).sum::<usize>() + self.trailer.len());
        for page in &output {
            bytes.extend_from_slice(&page.to_bytes());
        }
        bytes.extend_from_slice(&self.trailer);

        self.storage.seek(SeekFrom::Start(0))?;
        self.storage.write_all(&bytes)?;
        self.storage.truncate(bytes.len() as u64)?;
        self.storage.flush()?;

        self.length = bytes.len() as u64;
        let trailer = std::mem::take(&mut self.trailer);
        self.set_pages(output, trailer);

        Ok(())
    }
}

impl<S: Storage> PacketStore for OggStream<S> {
    fn packet(&self, index: usize) -> Result<Vec<u8>> {
        if let Some(data) = self.pending.get(&index) {
            return Ok(data.clone());
        }

        Ok(self
            .packets
            .get(index)
            .map(|span| self.packet_data(span))
            .unwrap_or_default())
    }

    fn set_packet(&mut self, index: usize, data: Vec<u8>) {
        self.pending.insert(index, data);
    }

    fn save(&mut self) -> Result<()> {
        let result = self.write_pending();
        // Pending packets never outlive a save attempt
        self.pending.clear();
        result
    }

    fn discard(&mut self) {
        self.pending.clear();
    }

    fn length(&self) -> u64 {
        self.length
    }
}

fn parse_pages(bytes: &[u8]) -> (Vec<Page>, Vec<u8>) {
    let mut pages = Vec::new();
    let mut reader = bytes;

    loop {
        let rest = reader;
        match Page::read(&mut reader) {
            Ok(Some(page)) => pages.push(page),
            Ok(None) => return (pages, Vec::new()),
            Err(e) => {
                if !pages.is_empty() {
                    warn!("Ignoring {} bytes after the last page: {}", rest.len(), e);
                }
                return (pages, rest.to_vec());
            }
        }
    }
}

fn index_packets(pages: &[Page], serial: Option<u32>) -> Vec<PacketSpan> {
    let mut packets = Vec::new();
    let mut open: Option<PacketSpan> = None;

    for (index, page) in pages.iter().enumerate() {
        if Some(page.bitstream_serial) != serial {
            continue;
        }

        if !page.is_continuation() && open.take().is_some() {
            debug!("Dropping unterminated packet before page {}", page.page_sequence);
        }

        let mut offset = 0;
        for &lacing in &page.segment_table {
            let span = open.get_or_insert_with(|| PacketSpan {
                pages: vec![index],
                start: offset,
                end: offset,
            });
            if span.pages.last() != Some(&index) {
                span.pages.push(index);
            }

            offset += lacing as usize;
            span.end = offset;

            if lacing < 255 {
                packets.extend(open.take());
            }
        }
    }

    packets
}
