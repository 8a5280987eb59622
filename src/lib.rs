//! oggflac - metadata reader and writer for FLAC streams in OGG containers
//!
//! ```no_run
//! use oggflac::{OggFlacFile, ReadStyle};
//!
//! let mut file = OggFlacFile::open_path("song.oga", true, ReadStyle::Average)?;
//! if let Some(tag) = file.tag_mut() {
//!     tag.set_album("Fillmore East");
//! }
//! file.save()?;
//! # Ok::<(), oggflac::Error>(())
//! ```

pub mod error;
pub mod flac;
pub mod ogg;
pub mod ogg_flac;
mod utils;

pub use error::{Error, Result};
pub use flac::{Picture, PictureType, Properties, PropertyMap, ReadStyle, VorbisComment, VorbisFields};
pub use ogg::{OggStream, PacketStore, Storage};
pub use ogg_flac::{is_supported, is_supported_bytes, HeaderLayout, OggFlacFile, ScanResult};
