// STREAMINFO decoding
//
// STREAMINFO layout (big-endian, 34 bytes):
// <16> minimum block size    <16> maximum block size
// <24> minimum frame size    <24> maximum frame size
// <20> sample rate  <3> channels - 1  <5> bits per sample - 1  <36> total samples
// <128> MD5 signature of the unencoded audio

use std::time::Duration;

use byteorder::{BigEndian, ReadBytesExt};
use log::warn;
use serde::Serialize;

/// Smallest STREAMINFO that still carries the sample rate and sample count
pub const STREAM_INFO_MIN_SIZE: usize = 18;

/// How much effort to spend reading audio properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ReadStyle {
    Fast,
    #[default]
    Average,
    Accurate,
}

/// Audio properties of a FLAC stream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Properties {
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub total_samples: u64,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Bitrate of the audio stream in kbit/s
    pub bitrate: u32,
    /// Hex encoded MD5 of the unencoded audio, absent when the encoder left it zeroed
    pub md5: Option<String>,
    pub read_style: ReadStyle,
}

impl Properties {
    /// Decode STREAMINFO bytes; `stream_length` is the byte length of the audio frames
    pub fn new(stream_info: &[u8], stream_length: u64, read_style: ReadStyle) -> Self {
        if stream_info.len() < STREAM_INFO_MIN_SIZE {
            warn!("STREAMINFO is {} bytes, too short to read properties", stream_info.len());
            return Properties {
                read_style,
                ..Properties::default()
            };
        }

        let mut reader = &stream_info[10..];

        // Sample rate (20), channels (3), bits per sample (5), total samples high nibble (4)
        let info = reader.read_u32::<BigEndian>().unwrap_or_default();
        let low_samples = reader.read_u32::<BigEndian>().unwrap_or_default();

        let sample_rate = info >> 12;
        let channels = (((info >> 9) & 7) + 1) as u8;
        let bits_per_sample = (((info >> 4) & 0x1F) + 1) as u8;
        let total_samples = (u64::from(info & 0x0F) << 32) | u64::from(low_samples);

        let (duration, bitrate) = if sample_rate > 0 && total_samples > 0 {
            let millis = total_samples * 1000 / u64::from(sample_rate);
            let bitrate = if millis > 0 { stream_length * 8 / millis } else { 0 };
            (Duration::from_millis(millis), bitrate as u32)
        } else {
            (Duration::ZERO, 0)
        };

        let md5 = stream_info
            .get(18..34)
            .filter(|sig| sig.iter().any(|&b| b != 0))
            .map(|sig| sig.iter().map(|b| format!("{:02x}", b)).collect());

        Properties {
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            duration,
            bitrate,
            md5,
            read_style,
        }
    }
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
