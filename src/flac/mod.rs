// FLAC metadata handling module

pub mod block;
pub mod picture;
pub mod properties;
pub mod vorbis;

pub use block::{Block, BlockHeader, BlockType, FLAC_SIGNATURE, MAX_BLOCK_LENGTH};
pub use picture::{Picture, PictureType};
pub use properties::{Properties, ReadStyle};
pub use vorbis::{PropertyMap, VorbisComment, VorbisFields};
