// VORBIS_COMMENT implementation for FLAC
//
// Layout (all integers little-endian):
// - vendor length (4) + vendor string
// - field count (4)
// - per field: length (4) + "KEY=value"
// - optional framing bit (Ogg Vorbis only, never in FLAC)

use crate::flac::picture::Picture;
use crate::utils::encoding::decode_utf8;

use std::collections::BTreeMap;
use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};

/// Field key to values, keys upper-cased
pub type PropertyMap = BTreeMap<String, Vec<String>>;

/// Vendor string written into comments created from scratch
pub const DEFAULT_VENDOR: &str = concat!("oggflac ", env!("CARGO_PKG_VERSION"));

/// Field carrying a base64 encoded FLAC PICTURE structure
pub const PICTURE_FIELD: &str = "METADATA_BLOCK_PICTURE";

/// Common Vorbis comment field names
pub struct VorbisFields;
impl VorbisFields {
    pub const TITLE: &str = "TITLE";
    pub const ARTIST: &str = "ARTIST";
    pub const ALBUM: &str = "ALBUM";
    pub const DATE: &str = "DATE";
    pub const TRACKNUMBER: &str = "TRACKNUMBER";
    pub const GENRE: &str = "GENRE";
    pub const COMMENT: &str = "COMMENT";
    pub const DESCRIPTION: &str = "DESCRIPTION";
}

/// Vorbis comment structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorbisComment {
    vendor: String,
    fields: Vec<(String, String)>,
    pictures: Vec<Picture>,
}

impl Default for VorbisComment {
    fn default() -> Self {
        VorbisComment {
            vendor: DEFAULT_VENDOR.to_string(),
            fields: Vec::new(),
            pictures: Vec::new(),
        }
    }
}

impl VorbisComment {
    /// Parse a comment block body
    ///
    /// Parsing is lenient: whatever was decoded before a truncation is kept,
    /// fields without `=` are dropped and undecodable pictures are skipped.
    pub fn parse(data: &[u8]) -> Self {
        let mut comment = VorbisComment {
            vendor: String::new(),
            fields: Vec::new(),
            pictures: Vec::new(),
        };

        if let Err(e) = comment.read_from(&mut &*data) {
            debug!("Vorbis comment is truncated ({}), keeping {} fields", e, comment.fields.len());
        }

        comment
    }

    fn read_from<R: Read>(&mut self, reader: &mut R) -> std::io::Result<()> {
        self.vendor = decode_utf8(&read_sized(reader)?);

        let count = reader.read_u32::<LittleEndian>()?;
        for _ in 0..count {
            let raw = read_sized(reader)?;

            let Some(split) = raw.iter().position(|&b| b == b'=') else {
                debug!("Skipping Vorbis comment field without a separator");
                continue;
            };

            let key = decode_utf8(&raw[..split]).to_ascii_uppercase();
            let value = &raw[split + 1..];

            if key == PICTURE_FIELD {
                match BASE64.decode(value).map_err(crate::Error::from).and_then(|b| Picture::parse(&b)) {
                    Ok(picture) => self.pictures.push(picture),
                    Err(e) => warn!("Skipping invalid {} field: {}", PICTURE_FIELD, e),
                }
                continue;
            }

            self.fields.push((key, decode_utf8(value)));
        }

        Ok(())
    }

    /// Render the comment block body
    pub fn render(&self, framing_bit: bool) -> Vec<u8> {
        let mut data = Vec::new();

        data.extend_from_slice(&(self.vendor.len() as u32).to_le_bytes());
        data.extend_from_slice(self.vendor.as_bytes());

        let count = self.fields.len() + self.pictures.len();
        data.extend_from_slice(&(count as u32).to_le_bytes());

        for (key, value) in &self.fields {
            let len = key.len() + 1 + value.len();
            data.extend_from_slice(&(len as u32).to_le_bytes());
            data.extend_from_slice(key.as_bytes());
            data.push(b'=');
            data.extend_from_slice(value.as_bytes());
        }

        for picture in &self.pictures {
            let encoded = BASE64.encode(picture.to_bytes());
            let len = PICTURE_FIELD.len() + 1 + encoded.len();
            data.extend_from_slice(&(len as u32).to_le_bytes());
            data.extend_from_slice(PICTURE_FIELD.as_bytes());
            data.push(b'=');
            data.extend_from_slice(encoded.as_bytes());
        }

        if framing_bit {
            data.push(0x01);
        }

        data
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Number of fields, pictures included
    pub fn field_count(&self) -> usize {
        self.fields.len() + self.pictures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// Get the first value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    /// Get every value of a field
    pub fn get_all(&self, field: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(f, _)| f.eq_ignore_ascii_case(field))
    }

    /// Add a value to a field, optionally replacing existing values
    ///
    /// Returns false and leaves the comment untouched if the key is invalid.
    pub fn add_field(&mut self, key: &str, value: &str, replace: bool) -> bool {
        if !is_valid_key(key) {
            warn!("Refusing invalid Vorbis comment key {:?}", key);
            return false;
        }

        if replace {
            self.remove_fields(key);
        }
        self.fields.push((key.to_ascii_uppercase(), value.to_string()));
        true
    }

    /// Remove every value of a field
    pub fn remove_fields(&mut self, key: &str) {
        self.fields.retain(|(f, _)| !f.eq_ignore_ascii_case(key));
    }

    pub fn title(&self) -> Option<&str> {
        self.get(VorbisFields::TITLE)
    }

    pub fn artist(&self) -> Option<&str> {
        self.get(VorbisFields::ARTIST)
    }

    pub fn album(&self) -> Option<&str> {
        self.get(VorbisFields::ALBUM)
    }

    pub fn genre(&self) -> Option<&str> {
        self.get(VorbisFields::GENRE)
    }

    pub fn date(&self) -> Option<&str> {
        self.get(VorbisFields::DATE)
    }

    /// COMMENT, falling back to DESCRIPTION
    pub fn comment(&self) -> Option<&str> {
        self.get(VorbisFields::COMMENT)
            .or_else(|| self.get(VorbisFields::DESCRIPTION))
    }

    /// Track number, ignoring any "/total" suffix
    pub fn track(&self) -> Option<u32> {
        self.get(VorbisFields::TRACKNUMBER)
            .and_then(|v| v.split('/').next())
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn set_title(&mut self, value: &str) {
        self.set_or_remove(VorbisFields::TITLE, value);
    }

    pub fn set_artist(&mut self, value: &str) {
        self.set_or_remove(VorbisFields::ARTIST, value);
    }

    pub fn set_album(&mut self, value: &str) {
        self.set_or_remove(VorbisFields::ALBUM, value);
    }

    pub fn set_genre(&mut self, value: &str) {
        self.set_or_remove(VorbisFields::GENRE, value);
    }

    pub fn set_date(&mut self, value: &str) {
        self.set_or_remove(VorbisFields::DATE, value);
    }

    pub fn set_comment(&mut self, value: &str) {
        self.remove_fields(VorbisFields::DESCRIPTION);
        self.set_or_remove(VorbisFields::COMMENT, value);
    }

    /// Set the track number, 0 removes it
    pub fn set_track(&mut self, track: u32) {
        if track == 0 {
            self.remove_fields(VorbisFields::TRACKNUMBER);
        } else {
            self.add_field(VorbisFields::TRACKNUMBER, &track.to_string(), true);
        }
    }

    fn set_or_remove(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.remove_fields(key);
        } else {
            self.add_field(key, value, true);
        }
    }

    /// All fields as a property map
    pub fn properties(&self) -> PropertyMap {
        let mut map = PropertyMap::new();
        for (key, value) in &self.fields {
            map.entry(key.clone()).or_default().push(value.clone());
        }
        map
    }

    /// Replace the fields with `properties`
    ///
    /// Fields missing from `properties` are removed. Entries with invalid keys
    /// are not applied and are returned to the caller.
    pub fn set_properties(&mut self, properties: &PropertyMap) -> PropertyMap {
        let mut rejected = PropertyMap::new();

        self.fields.retain(|(key, _)| properties.keys().any(|k| k.eq_ignore_ascii_case(key)));

        for (key, values) in properties {
            if !is_valid_key(key) {
                rejected.insert(key.clone(), values.clone());
                continue;
            }

            self.remove_fields(key);
            for value in values {
                self.fields.push((key.to_ascii_uppercase(), value.clone()));
            }
        }

        rejected
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn add_picture(&mut self, picture: Picture) {
        self.pictures.push(picture);
    }

    pub fn remove_all_pictures(&mut self) {
        self.pictures.clear();
    }
}

/// Keys are printable ASCII (0x20..=0x7D) without `=`
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| (0x20..=0x7D).contains(&b) && b != b'=')
}

fn read_sized<R: Read>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let mut bytes = Vec::new();
    reader.take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VorbisComment {
        let mut comment = VorbisComment::default();
        comment.set_title("Fillmore East");
        comment.set_artist("Frank Zappa");
        comment.add_field("genre", "Rock", false);
        comment.add_field("GENRE", "Jazz", false);
        comment.set_track(7);
        comment
    }

    #[test]
    fn render_then_parse_keeps_fields_and_vendor() {
        let comment = sample();
        let parsed = VorbisComment::parse(&comment.render(false));

        assert_eq!(parsed, comment);
        assert_eq!(parsed.vendor(), DEFAULT_VENDOR);
        assert_eq!(parsed.get_all("Genre"), vec!["Rock", "Jazz"]);
        assert_eq!(parsed.track(), Some(7));
    }

    #[test]
    fn framing_bit_is_appended_on_request() {
        let comment = sample();
        let plain = comment.render(false);
        let framed = comment.render(true);
        assert_eq!(framed.len(), plain.len() + 1);
        assert_eq!(framed.last(), Some(&0x01));
    }

    #[test]
    fn truncated_data_keeps_leading_fields() {
        let comment = sample();
        let data = comment.render(false);
        let parsed = VorbisComment::parse(&data[..data.len() - 3]);

        assert_eq!(parsed.title(), Some("Fillmore East"));
        assert_eq!(parsed.track(), None);
    }

    #[test]
    fn pictures_are_stored_as_base64_fields() {
        let mut comment = sample();
        comment.add_picture(Picture::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg".to_string(), "cover".to_string()));

        let data = comment.render(false);
        let text = String::from_utf8_lossy(&data);
        assert!(text.contains("METADATA_BLOCK_PICTURE="));

        let parsed = VorbisComment::parse(&data);
        assert_eq!(parsed.pictures().len(), 1);
        assert_eq!(parsed.pictures()[0].data, vec![0xFF, 0xD8, 0xFF]);
        assert!(!parsed.properties().contains_key(PICTURE_FIELD));

        let mut stripped = parsed;
        stripped.remove_all_pictures();
        assert!(stripped.render(false).len() < data.len());
    }

    #[test]
    fn set_properties_replaces_and_rejects_bad_keys() {
        let mut comment = sample();

        let mut map = PropertyMap::new();
        map.insert("TITLE".to_string(), vec!["Hot Rats".to_string()]);
        map.insert("BAD=KEY".to_string(), vec!["x".to_string()]);

        let rejected = comment.set_properties(&map);
        assert_eq!(rejected.len(), 1);
        assert!(rejected.contains_key("BAD=KEY"));

        assert_eq!(comment.title(), Some("Hot Rats"));
        assert_eq!(comment.artist(), None);
        assert_eq!(comment.properties().len(), 1);
    }

    #[test]
    fn key_validation() {
        assert!(is_valid_key("REPLAYGAIN_TRACK_GAIN"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("A=B"));
        assert!(!is_valid_key("Ñ"));
        assert!(!VorbisComment::default().add_field("~~~\u{7F}", "v", true));
    }

    #[test]
    fn comment_falls_back_to_description() {
        let mut comment = VorbisComment::default();
        comment.add_field(VorbisFields::DESCRIPTION, "liner notes", false);
        assert_eq!(comment.comment(), Some("liner notes"));

        comment.set_comment("");
        assert_eq!(comment.comment(), None);
    }
}
