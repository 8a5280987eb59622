// FLAC streams in an OGG container
//
// Reading scans the metadata chain once and builds the Vorbis comment and the
// audio properties from it. Saving re-renders the comment into the packet it
// came from; no other metadata block is touched.

pub mod scan;
pub mod write;

use crate::error::{Error, Result};
use crate::flac::block::FLAC_SIGNATURE;
use crate::flac::properties::{Properties, ReadStyle};
use crate::flac::vorbis::{PropertyMap, VorbisComment};
use crate::ogg::{OggStream, PacketStore, Storage, OGG_SIGNATURE};

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

pub use scan::{HeaderLayout, ScanResult};

/// Number of bytes sampled by [`is_supported`]
pub const PROBE_SIZE: usize = 1024;

/// Check whether a stream looks like Ogg FLAC
///
/// Both "OggS" and "fLaC" must appear somewhere in the first [`PROBE_SIZE`]
/// bytes. The reader position is restored afterwards.
pub fn is_supported<R: Read + Seek>(reader: &mut R) -> Result<bool> {
    let position = reader.stream_position()?;
    reader.seek(SeekFrom::Start(0))?;

    let mut buffer = Vec::with_capacity(PROBE_SIZE);
    reader.by_ref().take(PROBE_SIZE as u64).read_to_end(&mut buffer)?;
    reader.seek(SeekFrom::Start(position))?;

    Ok(is_supported_bytes(&buffer))
}

/// [`is_supported`] over a buffer that already holds the start of a stream
pub fn is_supported_bytes(buffer: &[u8]) -> bool {
    let buffer = &buffer[..buffer.len().min(PROBE_SIZE)];
    contains(buffer, OGG_SIGNATURE) && contains(buffer, FLAC_SIGNATURE)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// An Ogg FLAC file
pub struct OggFlacFile<P> {
    store: P,
    scan: ScanResult,
    valid: bool,
    comment: Option<VorbisComment>,
    properties: Option<Properties>,
}

impl OggFlacFile<OggStream<File>> {
    /// Open a file for reading, and for writing when permissions allow
    pub fn open_path<T: AsRef<Path>>(path: T, read_properties: bool, read_style: ReadStyle) -> Result<Self> {
        let path = path.as_ref();
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                debug!("{} is read-only, saving will fail", path.display());
                File::open(path)?
            }
            Err(e) => return Err(e.into()),
        };

        Self::open(file, read_properties, read_style)
    }
}

impl<S: Storage> OggFlacFile<OggStream<S>> {
    /// Read an Ogg FLAC stream from `storage`
    pub fn open(storage: S, read_properties: bool, read_style: ReadStyle) -> Result<Self> {
        Self::from_store(OggStream::new(storage)?, read_properties, read_style)
    }
}

impl<P: PacketStore> OggFlacFile<P> {
    /// Read from an existing packet store
    ///
    /// A stream that is not Ogg FLAC is not an error: the returned file reports
    /// `is_valid() == false`. Only failures of the store are returned.
    pub fn from_store(store: P, read_properties: bool, read_style: ReadStyle) -> Result<Self> {
        let mut file = OggFlacFile {
            store,
            scan: ScanResult::default(),
            valid: true,
            comment: None,
            properties: None,
        };

        file.read(read_properties, read_style)?;
        Ok(file)
    }

    fn read(&mut self, read_properties: bool, read_style: ReadStyle) -> Result<()> {
        self.scan()?;

        if !self.scan.scanned {
            self.valid = false;
            return Ok(());
        }

        self.comment = Some(if self.scan.has_comment {
            VorbisComment::parse(&self.scan.comment)
        } else {
            VorbisComment::default()
        });

        if read_properties {
            self.properties = Some(Properties::new(
                &self.scan.stream_info,
                self.scan.stream_length,
                read_style,
            ));
        }

        Ok(())
    }

    /// Scan the metadata chain unless that already happened or failed
    pub fn scan(&mut self) -> Result<()> {
        if self.scan.scanned || !self.valid {
            return Ok(());
        }

        match scan::scan(&self.store) {
            Ok(result) => self.scan = result,
            Err(Error::Io(e)) => return Err(Error::Io(e)),
            Err(e) => {
                debug!("Invalid Ogg FLAC stream: {}", e);
                self.valid = false;
            }
        }

        Ok(())
    }

    /// Write the Vorbis comment back into its packet and persist the stream
    pub fn save(&mut self) -> Result<()> {
        if !self.valid || !self.scan.scanned {
            return Err(Error::InvalidFile);
        }

        if !self.scan.has_comment {
            return Err(Error::NoCommentBlock);
        }

        let comment = self.comment.as_mut().ok_or(Error::InvalidFile)?;
        let block = write::render_comment_block(comment)?;

        let index = self.scan.comment_packet;
        let range = self.scan.comment_range.clone();

        // `comment_range` describes the committed packet, not a queued one
        self.store.discard();
        let packet = self.store.packet(index)?;
        let patched = write::splice_block(&packet, range.clone(), &block)?;

        self.store.set_packet(index, patched);
        if let Err(e) = self.store.save() {
            self.store.discard();
            return Err(e);
        }

        // Keep the scan facts in line with what is now on disk
        self.scan.comment = block[4..].to_vec();
        self.scan.comment_range = range.start..range.start + block.len();
        self.scan.stream_start = self.scan.stream_start - range.len() as u64 + block.len() as u64;
        self.scan.stream_length = self.store.length().saturating_sub(self.scan.stream_start);

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The Vorbis comment, empty if the stream had none
    pub fn tag(&self) -> Option<&VorbisComment> {
        self.comment.as_ref()
    }

    pub fn tag_mut(&mut self) -> Option<&mut VorbisComment> {
        self.comment.as_mut()
    }

    pub fn audio_properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }

    /// Whether the stream carried a VORBIS_COMMENT block
    pub fn has_vorbis_comment(&self) -> bool {
        self.scan.has_comment
    }

    /// All comment fields as a property map
    pub fn properties(&self) -> PropertyMap {
        self.comment.as_ref().map(VorbisComment::properties).unwrap_or_default()
    }

    /// Replace the comment fields, returning entries that could not be set
    pub fn set_properties(&mut self, properties: &PropertyMap) -> PropertyMap {
        match self.comment.as_mut() {
            Some(comment) => comment.set_properties(properties),
            None => properties.clone(),
        }
    }

    pub fn scan_result(&self) -> &ScanResult {
        &self.scan
    }

    pub fn stream_info_data(&self) -> &[u8] {
        &self.scan.stream_info
    }

    pub fn comment_data(&self) -> &[u8] {
        &self.scan.comment
    }

    /// Byte length of the audio frames following the metadata
    pub fn stream_length(&self) -> u64 {
        self.scan.stream_length
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn into_store(self) -> P {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn probe_needs_both_markers_in_any_order() {
        assert!(is_supported_bytes(b"OggS....fLaC"));
        assert!(is_supported_bytes(b"xxfLaCyyyOggSzz"));
        assert!(!is_supported_bytes(b"OggS....OpusHead"));
        assert!(!is_supported_bytes(b"fLaC without container"));
        assert!(!is_supported_bytes(b""));
    }

    #[test]
    fn probe_only_samples_the_prefix() {
        let mut data = b"OggS".to_vec();
        data.resize(PROBE_SIZE, 0);
        data.extend_from_slice(b"fLaC");
        assert!(!is_supported_bytes(&data));

        let mut reader = Cursor::new(data);
        reader.set_position(7);
        assert!(!is_supported(&mut reader).unwrap());
        assert_eq!(reader.position(), 7);
    }

    #[test]
    fn garbage_is_invalid_not_an_error() {
        let mut file = OggFlacFile::open(Cursor::new(vec![0u8; 64]), true, ReadStyle::Average).unwrap();

        assert!(!file.is_valid());
        assert!(file.tag().is_none());
        assert!(file.audio_properties().is_none());
        assert!(file.properties().is_empty());
        assert!(matches!(file.save(), Err(Error::InvalidFile)));
    }
}
