//! PNG chunk splitting and text-chunk decoding.

use std::io::Read;

use tracing::debug;

use crate::types::MetadataEntry;

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const DESCRIPTION: &str = "Description";
const UNKNOWN: &str = "Unknown";

/// A raw chunk: 4-character type code plus payload (CRC checked, then dropped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: [u8; 4],
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn is(&self, name: &[u8; 4]) -> bool {
        &self.name == name
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PngError {
    #[error("Missing PNG signature")]
    BadSignature,

    #[error("Truncated chunk at offset {0}")]
    Truncated(usize),

    #[error("PNG ended without an IEND chunk")]
    MissingEnd,

    #[error("CRC mismatch in chunk at offset {offset}: stored {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        offset: usize,
        expected: u32,
        computed: u32,
    },
}

/// Split a PNG stream into its chunks, stopping at `IEND`.
pub fn split_chunks(bytes: &[u8]) -> Result<Vec<Chunk>, PngError> {
    let total = bytes.len();
    let mut r = bytes;

    let mut sig = [0u8; 8];
    r.read_exact(&mut sig).map_err(|_| PngError::BadSignature)?;
    if sig != PNG_SIGNATURE {
        return Err(PngError::BadSignature);
    }

    let mut chunks = Vec::new();
    while !r.is_empty() {
        let offset = total - r.len();
        let len = read_u32_be(&mut r).ok_or(PngError::Truncated(offset))? as usize;

        let mut name = [0u8; 4];
        r.read_exact(&mut name)
            .map_err(|_| PngError::Truncated(offset))?;

        if r.len() < len {
            return Err(PngError::Truncated(offset));
        }
        let (data, rest) = r.split_at(len);
        r = rest;
        let expected = read_u32_be(&mut r).ok_or(PngError::Truncated(offset))?;
        let computed = chunk_crc(&name, data);
        if expected != computed {
            return Err(PngError::ChecksumMismatch {
                offset,
                expected,
                computed,
            });
        }

        let chunk = Chunk {
            name,
            data: data.to_vec(),
        };
        let end = chunk.is(b"IEND");
        chunks.push(chunk);
        if end {
            return Ok(chunks);
        }
    }

    Err(PngError::MissingEnd)
}

/// Decode every `tEXt` / `iTXt` chunk of a PNG stream.
///
/// Structural errors yield an empty list; PNG metadata is best-effort.
pub fn text_entries(bytes: &[u8]) -> Vec<MetadataEntry> {
    match split_chunks(bytes) {
        Ok(chunks) => chunks
            .iter()
            .filter_map(|chunk| match &chunk.name {
                b"tEXt" => Some(decode_text(&chunk.data)),
                b"iTXt" => Some(decode_itxt(&chunk.data)),
                _ => None,
            })
            .collect(),
        Err(e) => {
            debug!("PNG chunk decode failed: {e}");
            Vec::new()
        }
    }
}

/// `tEXt`: Latin-1 `keyword\0text`.
pub fn decode_text(data: &[u8]) -> MetadataEntry {
    let (keyword, text) = match data.iter().position(|&b| b == 0) {
        Some(nul) => (&data[..nul], &data[nul + 1..]),
        None => (data, &[][..]),
    };
    MetadataEntry::new(latin1(keyword), latin1(text))
}

/// `iTXt`, reduced to the one layout we care about.
///
/// Every NUL is dropped, which collapses the keyword, compression bytes,
/// language tag and translated keyword into one run.  A payload that then
/// starts with `Description` is split there; anything else is kept whole
/// under `Unknown`.
pub fn decode_itxt(data: &[u8]) -> MetadataEntry {
    let stripped: Vec<u8> = data.iter().copied().filter(|&b| b != 0).collect();
    let prefix = DESCRIPTION.len();

    if stripped.len() >= prefix && String::from_utf8_lossy(&stripped[..prefix]) == DESCRIPTION {
        MetadataEntry::new(
            DESCRIPTION,
            String::from_utf8_lossy(&stripped[prefix..]).into_owned(),
        )
    } else {
        MetadataEntry::new(UNKNOWN, String::from_utf8_lossy(&stripped).into_owned())
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// CRC-32 over the chunk type and payload, as stored after each chunk.
pub fn chunk_crc(name: &[u8; 4], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(name);
    hasher.update(data);
    hasher.finalize()
}

fn read_u32_be(r: &mut impl Read) -> Option<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).ok()?;
    Some(u32::from_be_bytes(buf))
}
