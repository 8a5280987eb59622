use oggflac::flac::{BlockHeader, BlockType};
use oggflac::ogg::page::paginate;
use oggflac::ogg::{OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_EOS};
use oggflac::{Error, OggFlacFile, OggStream, PacketStore, Picture, PictureType, ReadStyle, Storage};

use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

const SERIAL: u32 = 0x0F1A_C000;
const TOTAL_SAMPLES: u64 = 441_000;

type MemoryFile = OggFlacFile<OggStream<Cursor<Vec<u8>>>>;

fn block(block_type: u8, last: bool, body: &[u8]) -> Vec<u8> {
    let header = BlockHeader {
        is_last: last,
        block_type: BlockType::from_byte(block_type),
        length: body.len() as u32,
    };
    let mut bytes = header.to_bytes().unwrap().to_vec();
    bytes.extend_from_slice(body);
    bytes
}

/// Storage that refuses its first `failures` writes, like a full disk
struct FullDisk {
    inner: Cursor<Vec<u8>>,
    failures: usize,
}

impl FullDisk {
    fn new(bytes: Vec<u8>, failures: usize) -> Self {
        FullDisk { inner: Cursor::new(bytes), failures }
    }
}

impl Read for FullDisk {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(std::io::Error::new(ErrorKind::Other, "no space left on device"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FullDisk {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Storage for FullDisk {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.inner.truncate(len)
    }
}

/// 44.1 kHz, stereo, 16 bits, ten seconds
fn stream_info() -> Vec<u8> {
    let mut info = vec![0u8; 34];
    let packed: u32 = (44_100 << 12) | (1 << 9) | (15 << 4);
    info[10..14].copy_from_slice(&packed.to_be_bytes());
    info[14..18].copy_from_slice(&(TOTAL_SAMPLES as u32).to_be_bytes());
    info
}

fn comment_body(vendor: &str, fields: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    body.extend_from_slice(vendor.as_bytes());
    body.extend_from_slice(&(fields.len() as u32).to_le_bytes());
    for field in fields {
        body.extend_from_slice(&(field.len() as u32).to_le_bytes());
        body.extend_from_slice(field.as_bytes());
    }
    body
}

fn preamble(header_packets: u16) -> Vec<u8> {
    let mut bytes = vec![0x7F, b'F', b'L', b'A', b'C', 1, 0];
    bytes.extend_from_slice(&header_packets.to_be_bytes());
    bytes.extend_from_slice(b"fLaC");
    bytes
}

fn audio_packets() -> Vec<Vec<u8>> {
    (0..3u8).map(|i| vec![0xFF, 0xF8, i, 0x42].repeat(200)).collect()
}

/// One packet per page run, BOS on the first page and EOS on the last
fn ogg(packets: &[Vec<u8>]) -> Vec<u8> {
    let mut pages: Vec<_> = packets.iter().flat_map(|p| paginate(p, SERIAL, 0)).collect();

    pages[0].header_type |= OGG_HEADER_TYPE_BOS;
    if let Some(last) = pages.last_mut() {
        last.header_type |= OGG_HEADER_TYPE_EOS;
        last.granule_position = TOTAL_SAMPLES;
    }

    let mut bytes = Vec::new();
    for (sequence, page) in pages.iter_mut().enumerate() {
        page.page_sequence = sequence as u32;
        page.gen_crc();
        bytes.extend(page.to_bytes());
    }
    bytes
}

/// FLAC 1.1.2+ file with the comment and padding in packet 0
fn self_contained_file() -> Vec<u8> {
    let mut head = preamble(0);
    head.extend(block(0, false, &stream_info()));
    head.extend(block(4, false, &comment_body("reference libFLAC 1.3.2", &["TITLE=Song", "ARTIST=Band"])));
    head.extend(block(1, true, &[0; 64]));

    let mut packets = vec![head];
    packets.extend(audio_packets());
    ogg(&packets)
}

/// FLAC 1.1.0 file, one metadata block per packet
fn native_file(with_comment: bool) -> Vec<u8> {
    let mut packets = vec![b"fLaC".to_vec(), block(0, false, &stream_info())];
    if with_comment {
        packets.push(block(4, false, &comment_body("libFLAC 1.1.0", &["ALBUM=Old"])));
    }
    packets.push(block(1, true, &[0; 16]));
    packets.extend(audio_packets());
    ogg(&packets)
}

fn open(bytes: Vec<u8>) -> MemoryFile {
    OggFlacFile::open(Cursor::new(bytes), true, ReadStyle::Average).unwrap()
}

fn stored(file: MemoryFile) -> Vec<u8> {
    file.into_store().into_inner().into_inner()
}

#[test]
fn reads_self_contained_layout() {
    let bytes = self_contained_file();
    let file = open(bytes.clone());

    assert!(file.is_valid());
    assert!(file.has_vorbis_comment());
    assert_eq!(file.scan_result().comment_packet, 0);
    assert_eq!(file.scan_result().stream_start, 13 + 38 + 64 + 68);
    assert_eq!(file.scan_result().stream_start + file.stream_length(), bytes.len() as u64);

    let tag = file.tag().unwrap();
    assert_eq!(tag.vendor(), "reference libFLAC 1.3.2");
    assert_eq!(tag.title(), Some("Song"));
    assert_eq!(tag.artist(), Some("Band"));

    let properties = file.audio_properties().unwrap();
    assert_eq!(properties.sample_rate, 44_100);
    assert_eq!(properties.channels, 2);
    assert_eq!(properties.bits_per_sample, 16);
    assert_eq!(properties.duration.as_secs(), 10);
}

#[test]
fn save_round_trips_through_a_fresh_scan() {
    let original = self_contained_file();
    let mut file = open(original.clone());

    {
        let tag = file.tag_mut().unwrap();
        tag.set_title("A much longer title than the one before");
        tag.set_track(7);
        tag.add_picture(Picture {
            picture_type: PictureType::CoverFront,
            ..Picture::new(vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3], "image/png".into(), "front".into())
        });
    }
    file.save().unwrap();

    let saved_comment = file.comment_data().to_vec();
    let saved_start = file.scan_result().stream_start;
    let bytes = stored(file);

    let reopened = open(bytes.clone());
    assert!(reopened.is_valid());
    assert_eq!(reopened.comment_data(), &saved_comment[..]);
    assert_eq!(reopened.scan_result().stream_start, saved_start);
    assert_eq!(reopened.scan_result().stream_start + reopened.stream_length(), bytes.len() as u64);

    let tag = reopened.tag().unwrap();
    assert_eq!(tag.title(), Some("A much longer title than the one before"));
    assert_eq!(tag.track(), Some(7));
    assert_eq!(tag.vendor(), "reference libFLAC 1.3.2");
    assert_eq!(tag.pictures().len(), 1);
    assert_eq!(tag.pictures()[0].description, "front");

    // Audio packets come through untouched
    let before = OggStream::new(Cursor::new(original)).unwrap();
    let after = reopened.into_store();
    assert_eq!(before.packet_count(), after.packet_count());
    for index in 1..before.packet_count() {
        assert_eq!(before.packet(index).unwrap(), after.packet(index).unwrap());
    }
}

#[test]
fn saving_an_unchanged_comment_is_stable() {
    let mut file = open(self_contained_file());
    file.save().unwrap();
    let first = stored(file);

    let mut file = open(first.clone());
    file.save().unwrap();
    assert_eq!(stored(file), first);
}

#[test]
fn native_layout_comment_in_its_own_packet() {
    let bytes = native_file(true);
    let mut file = open(bytes);

    assert_eq!(file.scan_result().comment_packet, 2);
    assert_eq!(file.tag().unwrap().album(), Some("Old"));

    file.tag_mut().unwrap().set_album("New");
    file.save().unwrap();

    let reopened = open(stored(file));
    assert_eq!(reopened.tag().unwrap().album(), Some("New"));
    assert_eq!(reopened.scan_result().comment_packet, 2);
}

#[test]
fn save_without_a_comment_block_leaves_the_stream_alone() {
    let bytes = native_file(false);
    let mut file = open(bytes.clone());

    assert!(file.is_valid());
    assert!(!file.has_vorbis_comment());
    assert!(file.tag().unwrap().is_empty());

    file.tag_mut().unwrap().set_title("Nowhere to go");
    assert!(matches!(file.save(), Err(Error::NoCommentBlock)));
    assert_eq!(stored(file), bytes);
}

#[test]
fn oversized_pictures_are_dropped_on_save() {
    let mut file = open(self_contained_file());
    file.tag_mut()
        .unwrap()
        .add_picture(Picture::new(vec![0xAB; 13 * 1024 * 1024], "image/jpeg".into(), String::new()));

    file.save().unwrap();
    assert!(file.tag().unwrap().pictures().is_empty());

    let reopened = open(stored(file));
    assert!(reopened.tag().unwrap().pictures().is_empty());
    assert_eq!(reopened.tag().unwrap().title(), Some("Song"));
}

#[test]
fn oversized_fields_fail_without_writing() {
    let bytes = self_contained_file();
    let mut file = open(bytes.clone());
    file.tag_mut().unwrap().set_comment(&"x".repeat(17 * 1024 * 1024));

    assert!(matches!(file.save(), Err(Error::TooMuchData)));
    assert_eq!(stored(file), bytes);
}

#[test]
fn stream_info_must_come_first() {
    let mut head = preamble(0);
    head.extend(block(4, false, &comment_body("v", &[])));
    head.extend(block(0, true, &stream_info()));

    let mut file = open(ogg(&[head]));
    assert!(!file.is_valid());
    assert!(file.tag().is_none());
    assert!(matches!(file.save(), Err(Error::InvalidFile)));
}

#[test]
fn probe_accepts_ogg_flac_only() {
    let mut reader = Cursor::new(self_contained_file());
    assert!(oggflac::is_supported(&mut reader).unwrap());
    assert!(oggflac::is_supported_bytes(&native_file(false)));

    let opus = ogg(&[b"OpusHead\x01\x02".to_vec()]);
    assert!(!oggflac::is_supported_bytes(&opus));
}

#[test]
fn edits_files_on_disk() {
    let mut temp = tempfile::NamedTempFile::new().unwrap();
    temp.write_all(&self_contained_file()).unwrap();
    temp.flush().unwrap();

    let mut file = OggFlacFile::open_path(temp.path(), false, ReadStyle::Fast).unwrap();
    assert!(file.audio_properties().is_none());
    file.tag_mut().unwrap().set_genre("Jazz");
    file.save().unwrap();
    drop(file);

    let bytes = std::fs::read(temp.path()).unwrap();
    let reopened = open(bytes.clone());
    assert_eq!(reopened.tag().unwrap().genre(), Some("Jazz"));
    assert_eq!(reopened.tag().unwrap().title(), Some("Song"));
    assert_eq!(reopened.scan_result().stream_start + reopened.stream_length(), bytes.len() as u64);
}

#[test]
fn failed_write_propagates_and_retry_succeeds() {
    let bytes = native_file(true);
    let mut file = OggFlacFile::open(FullDisk::new(bytes.clone(), 1), false, ReadStyle::Fast).unwrap();

    file.tag_mut().unwrap().set_title("A title long enough to grow the packet");
    assert!(matches!(file.save(), Err(Error::Io(_))));
    assert_eq!(file.store().get_ref().inner.get_ref(), &bytes);
    assert_eq!(open(bytes).tag().unwrap().album(), Some("Old"));

    file.save().unwrap();
    let saved_comment = file.comment_data().to_vec();
    let stored = file.into_store().into_inner().inner.into_inner();

    let reopened = open(stored.clone());
    assert!(reopened.is_valid());
    assert_eq!(reopened.scan_result().comment_packet, 2);
    assert_eq!(reopened.comment_data(), &saved_comment[..]);
    assert_eq!(reopened.tag().unwrap().title(), Some("A title long enough to grow the packet"));
    assert_eq!(reopened.tag().unwrap().album(), Some("Old"));
    assert_eq!(reopened.scan_result().stream_start + reopened.stream_length(), stored.len() as u64);
}

#[test]
fn empty_stream_info_is_invalid() {
    let mut packets = vec![b"fLaC".to_vec(), block(0, true, &[])];
    packets.extend(audio_packets());

    let file = open(ogg(&packets));
    assert!(!file.is_valid());
    assert!(file.stream_info_data().is_empty());
}
