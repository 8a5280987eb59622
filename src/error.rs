// Error types for oggflac

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing Ogg FLAC metadata
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Any I/O error from the underlying storage
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Errors that arise while reading or writing Ogg pages
    #[error("OGG: {0}")]
    Ogg(&'static str),
    /// Errors that arise while decoding FLAC metadata blocks
    #[error("FLAC: {0}")]
    Flac(&'static str),
    /// The file failed to scan and cannot be saved
    #[error("File is not a valid Ogg FLAC stream")]
    InvalidFile,
    /// The stream carries no VORBIS_COMMENT block to replace
    #[error("Stream has no VORBIS_COMMENT block to replace")]
    NoCommentBlock,
    /// A metadata block exceeds the 24-bit length field
    #[error("Metadata block is too large (more than 16777215 bytes)")]
    TooMuchData,
    /// A FLAC picture structure could not be decoded
    #[error("Picture contains invalid data")]
    InvalidPicture,
    /// A METADATA_BLOCK_PICTURE field was not valid base64
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}
