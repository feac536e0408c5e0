//! Compressed RTF (LZFu) decoding.
//!
//! `.msg` files usually carry their RTF body compressed with a simple LZ77
//! variant whose dictionary starts out filled with a common RTF prefix.

use crate::error::{MsgExtractError, Result};

const HEADER_LEN: usize = 16;
const DICT_SIZE: usize = 4096;
const MAGIC_COMPRESSED: u32 = 0x7546_5A4C; // "LZFu"
const MAGIC_UNCOMPRESSED: u32 = 0x414C_454D; // "MELA"
const MAX_EXPANSION: usize = 9;

const PREBUF: &[u8] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}{\\f0\\fnil \\froman \
\\fswiss \\fmodern \\fscript \\fdecor MS Sans SerifSymbolArialTimes New RomanCourier\
{\\colortbl\\red0\\green0\\blue0\r\n\\par \\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < HEADER_LEN {
        return Err(decode_error(format!(
            "header needs {} bytes, found {}",
            HEADER_LEN,
            data.len()
        )));
    }

    let comp_size = read_u32(data, 0) as usize;
    let raw_size = read_u32(data, 4) as usize;
    let magic = read_u32(data, 8);

    // comp_size counts everything after the size field itself.
    let end = (comp_size + 4).min(data.len());
    let payload = &data[HEADER_LEN..end.max(HEADER_LEN)];

    match magic {
        MAGIC_UNCOMPRESSED => Ok(payload[..raw_size.min(payload.len())].to_vec()),
        MAGIC_COMPRESSED => decompress_lzfu(payload, raw_size),
        other => Err(decode_error(format!(
            "unknown compression type 0x{:08X}",
            other
        ))),
    }
}

fn decompress_lzfu(payload: &[u8], raw_size: usize) -> Result<Vec<u8>> {
    let mut dict = [0u8; DICT_SIZE];
    dict[..PREBUF.len()].copy_from_slice(PREBUF);
    let mut write_pos = PREBUF.len();

    // The declared size is untrusted. A two byte reference expands to at
    // most 17 bytes, which bounds the output by the payload.
    let bound = payload.len().saturating_mul(MAX_EXPANSION);
    let mut output = Vec::with_capacity(raw_size.min(bound));
    let mut pos = 0;

    while pos < payload.len() {
        let control = payload[pos];
        pos += 1;

        for bit in 0..8 {
            if control & (1 << bit) == 0 {
                let Some(&byte) = payload.get(pos) else {
                    return Err(decode_error("missing end marker".to_string()));
                };
                pos += 1;
                output.push(byte);
                dict[write_pos] = byte;
                write_pos = (write_pos + 1) % DICT_SIZE;
                continue;
            }

            if pos + 2 > payload.len() {
                return Err(decode_error("truncated dictionary reference".to_string()));
            }
            let reference = u16::from_be_bytes([payload[pos], payload[pos + 1]]) as usize;
            pos += 2;

            let offset = reference >> 4;
            let length = (reference & 0x0F) + 2;

            if offset == write_pos {
                return Ok(output);
            }

            for i in 0..length {
                let byte = dict[(offset + i) % DICT_SIZE];
                output.push(byte);
                dict[write_pos] = byte;
                write_pos = (write_pos + 1) % DICT_SIZE;
            }
        }
    }

    Err(decode_error("missing end marker".to_string()))
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn decode_error(message: String) -> MsgExtractError {
    MsgExtractError::RtfDecode { message }
}
