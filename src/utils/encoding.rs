// Text decoding helpers

use encoding_rs::UTF_8;

/// Decode UTF-8 text, replacing malformed sequences
///
/// Vorbis comments are UTF-8 by definition, but files in the wild carry
/// Latin-1 leftovers often enough that failing hard is not useful.
pub fn decode_utf8(data: &[u8]) -> String {
    UTF_8.decode_without_bom_handling(data).0.into_owned()
}
