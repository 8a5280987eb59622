// FLAC PICTURE structure
//
// Used verbatim as a METADATA_BLOCK_PICTURE comment field (base64 encoded)
// inside the Vorbis comment of an Ogg FLAC stream.

use crate::error::{Error, Result};

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

/// Picture types according to the FLAC specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    Other,
    FileIcon,
    OtherFileIcon,
    CoverFront,
    CoverBack,
    LeafletPage,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    VideoScreenCapture,
    BrightColouredFish,
    Illustration,
    BandLogo,
    PublisherLogo,
    Undefined(u32),
}

impl PictureType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => PictureType::Other,
            1 => PictureType::FileIcon,
            2 => PictureType::OtherFileIcon,
            3 => PictureType::CoverFront,
            4 => PictureType::CoverBack,
            5 => PictureType::LeafletPage,
            6 => PictureType::Media,
            7 => PictureType::LeadArtist,
            8 => PictureType::Artist,
            9 => PictureType::Conductor,
            10 => PictureType::Band,
            11 => PictureType::Composer,
            12 => PictureType::Lyricist,
            13 => PictureType::RecordingLocation,
            14 => PictureType::DuringRecording,
            15 => PictureType::DuringPerformance,
            16 => PictureType::VideoScreenCapture,
            17 => PictureType::BrightColouredFish,
            18 => PictureType::Illustration,
            19 => PictureType::BandLogo,
            20 => PictureType::PublisherLogo,
            other => PictureType::Undefined(other),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            PictureType::Other => 0,
            PictureType::FileIcon => 1,
            PictureType::OtherFileIcon => 2,
            PictureType::CoverFront => 3,
            PictureType::CoverBack => 4,
            PictureType::LeafletPage => 5,
            PictureType::Media => 6,
            PictureType::LeadArtist => 7,
            PictureType::Artist => 8,
            PictureType::Conductor => 9,
            PictureType::Band => 10,
            PictureType::Composer => 11,
            PictureType::Lyricist => 12,
            PictureType::RecordingLocation => 13,
            PictureType::DuringRecording => 14,
            PictureType::DuringPerformance => 15,
            PictureType::VideoScreenCapture => 16,
            PictureType::BrightColouredFish => 17,
            PictureType::Illustration => 18,
            PictureType::BandLogo => 19,
            PictureType::PublisherLogo => 20,
            PictureType::Undefined(value) => value,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PictureType::Other => "Other",
            PictureType::FileIcon => "File Icon",
            PictureType::OtherFileIcon => "Other File Icon",
            PictureType::CoverFront => "Cover (front)",
            PictureType::CoverBack => "Cover (back)",
            PictureType::LeafletPage => "Leaflet page",
            PictureType::Media => "Media",
            PictureType::LeadArtist => "Lead artist",
            PictureType::Artist => "Artist",
            PictureType::Conductor => "Conductor",
            PictureType::Band => "Band",
            PictureType::Composer => "Composer",
            PictureType::Lyricist => "Lyricist",
            PictureType::RecordingLocation => "Recording Location",
            PictureType::DuringRecording => "During recording",
            PictureType::DuringPerformance => "During performance",
            PictureType::VideoScreenCapture => "Video screen capture",
            PictureType::BrightColouredFish => "Bright coloured fish",
            PictureType::Illustration => "Illustration",
            PictureType::BandLogo => "Band logo",
            PictureType::PublisherLogo => "Publisher logo",
            PictureType::Undefined(_) => "Undefined",
        }
    }
}

/// An embedded picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub picture_type: PictureType,
    pub mime_type: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    pub data: Vec<u8>,
}

impl Picture {
    /// Create a front cover picture from image data
    pub fn new(data: Vec<u8>, mime_type: String, description: String) -> Self {
        Picture {
            picture_type: PictureType::CoverFront,
            mime_type,
            description,
            width: 0,
            height: 0,
            depth: 0,
            colors: 0,
            data,
        }
    }

    /// Decode a FLAC PICTURE structure
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut &*bytes).map_err(|_| Error::InvalidPicture)
    }

    fn read<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let picture_type = PictureType::from_u32(reader.read_u32::<BigEndian>()?);
        let mime_type = read_string(reader)?;
        let description = read_string(reader)?;
        let width = reader.read_u32::<BigEndian>()?;
        let height = reader.read_u32::<BigEndian>()?;
        let depth = reader.read_u32::<BigEndian>()?;
        let colors = reader.read_u32::<BigEndian>()?;

        let data_len = reader.read_u32::<BigEndian>()? as usize;
        let mut data = Vec::new();
        reader.take(data_len as u64).read_to_end(&mut data)?;
        if data.len() != data_len {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }

        Ok(Picture {
            picture_type,
            mime_type,
            description,
            width,
            height,
            depth,
            colors,
            data,
        })
    }

    /// Encode the picture as a FLAC PICTURE structure
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(32 + self.mime_type.len() + self.description.len() + self.data.len());

        result.extend_from_slice(&self.picture_type.as_u32().to_be_bytes());
        result.extend_from_slice(&(self.mime_type.len() as u32).to_be_bytes());
        result.extend_from_slice(self.mime_type.as_bytes());
        result.extend_from_slice(&(self.description.len() as u32).to_be_bytes());
        result.extend_from_slice(self.description.as_bytes());
        result.extend_from_slice(&self.width.to_be_bytes());
        result.extend_from_slice(&self.height.to_be_bytes());
        result.extend_from_slice(&self.depth.to_be_bytes());
        result.extend_from_slice(&self.colors.to_be_bytes());
        result.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        result.extend_from_slice(&self.data);

        result
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            _ => "jpg",
        }
    }
}

fn read_string<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let len = reader.read_u32::<BigEndian>()? as usize;
    let mut bytes = Vec::new();
    reader.take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(crate::utils::encoding::decode_utf8(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picture_survives_encoding() {
        let mut picture = Picture::new(vec![0x89, b'P', b'N', b'G'], "image/png".to_string(), "front".to_string());
        picture.width = 600;
        picture.height = 400;
        picture.depth = 24;

        let parsed = Picture::parse(&picture.to_bytes()).unwrap();
        assert_eq!(parsed, picture);
        assert_eq!(parsed.extension(), "png");
        assert_eq!(parsed.picture_type.as_str(), "Cover (front)");
    }

    #[test]
    fn truncated_picture_is_invalid() {
        let picture = Picture::new(vec![1, 2, 3, 4], "image/jpeg".to_string(), String::new());
        let bytes = picture.to_bytes();
        assert!(matches!(Picture::parse(&bytes[..bytes.len() - 1]), Err(Error::InvalidPicture)));
    }

    #[test]
    fn undefined_types_round_trip_their_value() {
        assert_eq!(PictureType::from_u32(42), PictureType::Undefined(42));
        assert_eq!(PictureType::from_u32(42).as_u32(), 42);
    }
}
