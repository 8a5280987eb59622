// Comment block patch-back

use crate::error::{Error, Result};
use crate::flac::block::BlockType;
use crate::flac::vorbis::VorbisComment;

use std::ops::Range;

use log::{debug, warn};

/// Frame `comment` as a VORBIS_COMMENT metadata block
///
/// A body that does not fit the 24-bit length field is rendered again without
/// pictures. If it still does not fit, nothing is produced.
///
/// The last-block flag is always left clear.
pub fn render_comment_block(comment: &mut VorbisComment) -> Result<Vec<u8>> {
    let mut data = comment.render(false);

    // Put the size in 32 bits, the top byte must stay clear
    let mut header = length_prefix(data.len());
    if header[0] != 0 {
        comment.remove_all_pictures();
        data = comment.render(false);
        header = length_prefix(data.len());

        if header[0] != 0 {
            debug!("Metadata block is too large ({} bytes) even without pictures", data.len());
            return Err(Error::TooMuchData);
        }

        warn!("Metadata block is too large, pictures removed");
    }

    header[0] = BlockType::VorbisComment.to_byte();

    let mut block = Vec::with_capacity(header.len() + data.len());
    block.extend_from_slice(&header);
    block.extend_from_slice(&data);

    Ok(block)
}

/// Replace `range` of `packet` with `block`, keeping anything around it
pub fn splice_block(packet: &[u8], range: Range<usize>, block: &[u8]) -> Result<Vec<u8>> {
    if range.start > range.end || range.end > packet.len() {
        return Err(Error::Flac("Comment block no longer matches its packet"));
    }

    let mut patched = Vec::with_capacity(packet.len() - range.len() + block.len());
    patched.extend_from_slice(&packet[..range.start]);
    patched.extend_from_slice(block);
    patched.extend_from_slice(&packet[range.end..]);

    Ok(patched)
}

fn length_prefix(len: usize) -> [u8; 4] {
    u32::try_from(len).unwrap_or(u32::MAX).to_be_bytes()
}
