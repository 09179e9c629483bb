use log::debug;

use crate::config::LoadOptions;
use crate::error::{ChunkKind, GlbError, Result};

pub const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
pub const CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

pub const HEADER_LENGTH: usize = 12;
pub const CHUNK_HEADER_LENGTH: usize = 8;

fn buffer_to_ascii(buffer: &[u8]) -> String {
    buffer
        .iter()
        .map(|&x| if x.is_ascii_graphic() { x as char } else { '.' })
        .collect()
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// The two payloads of a GLB container, borrowed from the input bytes.
#[derive(Debug, Clone, Copy)]
pub struct GlbContainer<'a> {
    pub version: u32,
    /// Total byte length declared in the header.
    pub length: u32,
    pub json: &'a [u8],
    pub bin: &'a [u8],
}

impl<'a> GlbContainer<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Self::parse_with(data, &LoadOptions::default())
    }

    /// Validate the header and walk the chunk table.
    ///
    /// The declared chunk lengths are trusted; padding is whatever the writer
    /// accounted for in those lengths.
    pub fn parse_with(data: &'a [u8], options: &LoadOptions) -> Result<Self> {
        if data.len() < HEADER_LENGTH {
            return Err(GlbError::InvalidContainer(format!(
                "{} bytes is too small for a GLB header",
                data.len()
            )));
        }

        let magic = read_u32_le(data, 0).unwrap_or_default();
        if magic != GLB_MAGIC {
            return Err(GlbError::InvalidContainer(format!(
                "bad magic {:#010x} ({:?})",
                magic,
                buffer_to_ascii(&data[0..4])
            )));
        }

        let version = read_u32_le(data, 4).unwrap_or_default();
        if options.strict_version && version != GLB_VERSION {
            return Err(GlbError::UnsupportedVersion(version));
        }

        let length = read_u32_le(data, 8).unwrap_or_default();
        let end = length as usize;
        if end > data.len() {
            return Err(GlbError::InvalidContainer(format!(
                "header declares {} bytes but only {} are present",
                end,
                data.len()
            )));
        }

        let mut offset = HEADER_LENGTH;
        let mut json: Option<&'a [u8]> = None;
        let mut bin: Option<&'a [u8]> = None;

        while offset + CHUNK_HEADER_LENGTH <= end {
            let chunk_length = read_u32_le(data, offset).unwrap_or_default() as usize;
            let chunk_type = read_u32_le(data, offset + 4).unwrap_or_default();
            let start = offset + CHUNK_HEADER_LENGTH;

            let chunk_end = start.checked_add(chunk_length).filter(|&e| e <= end).ok_or_else(|| {
                GlbError::InvalidContainer(format!(
                    "chunk at offset {} with length {} extends past byte {}",
                    offset, chunk_length, end
                ))
            })?;
            let payload = &data[start..chunk_end];

            match chunk_type {
                CHUNK_JSON => {
                    if json.replace(payload).is_some() {
                        return Err(GlbError::InvalidContainer(format!(
                            "second JSON chunk at offset {}",
                            offset
                        )));
                    }
                }
                CHUNK_BIN => {
                    if bin.replace(payload).is_some() {
                        return Err(GlbError::InvalidContainer(format!(
                            "second BIN chunk at offset {}",
                            offset
                        )));
                    }
                }
                other => {
                    debug!(
                        "skipping unknown chunk {:?} ({} bytes) at offset {}",
                        buffer_to_ascii(&other.to_le_bytes()),
                        chunk_length,
                        offset
                    );
                }
            }

            offset = chunk_end;
        }

        let json = json.ok_or(GlbError::MissingChunk(ChunkKind::Json))?;
        let bin = bin.ok_or(GlbError::MissingChunk(ChunkKind::Bin))?;

        Ok(Self {
            version,
            length,
            json,
            bin,
        })
    }
}

/// Assemble a GLB container from a JSON document and a binary payload.
/// Both chunks are padded to four bytes, JSON with spaces and BIN with zeros.
pub fn write_container(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let json_padded = align_to_4(json.len());
    let bin_padded = align_to_4(bin.len());
    let total = HEADER_LENGTH + CHUNK_HEADER_LENGTH * 2 + json_padded + bin_padded;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_padded as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(json);
    out.resize(out.len() + json_padded - json.len(), b' ');

    out.extend_from_slice(&(bin_padded as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(bin);
    out.resize(out.len() + bin_padded - bin.len(), 0);

    out
}

pub fn align_to_4(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(chunk_type: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&chunk_type.to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn container(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = Vec::new();
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&((HEADER_LENGTH + body.len()) as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn magic_is_gltf_ascii() {
        assert_eq!(u32::from_le_bytes(*b"glTF"), GLB_MAGIC);
        assert_eq!(u32::from_le_bytes(*b"JSON"), CHUNK_JSON);
        assert_eq!(u32::from_le_bytes(*b"BIN\0"), CHUNK_BIN);
    }

    #[test]
    fn splits_json_and_bin() {
        let data = container(&[chunk(CHUNK_JSON, b"{}  "), chunk(CHUNK_BIN, &[1, 2, 3, 4])]);
        let glb = GlbContainer::parse(&data).unwrap();
        assert_eq!(glb.version, 2);
        assert_eq!(glb.length as usize, data.len());
        assert_eq!(glb.json, b"{}  ");
        assert_eq!(glb.bin, &[1, 2, 3, 4]);
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let data = container(&[
            chunk(CHUNK_JSON, b"{}  "),
            chunk(u32::from_le_bytes(*b"XTRA"), &[9; 8]),
            chunk(CHUNK_BIN, &[7; 4]),
        ]);
        let glb = GlbContainer::parse(&data).unwrap();
        assert_eq!(glb.bin, &[7; 4]);
    }

    #[test]
    fn bad_magic_is_invalid_container() {
        let mut data = container(&[chunk(CHUNK_JSON, b"{}  "), chunk(CHUNK_BIN, &[0; 4])]);
        data[0] = b'G';
        assert!(matches!(
            GlbContainer::parse(&data),
            Err(GlbError::InvalidContainer(_))
        ));
    }

    #[test]
    fn short_input_is_invalid_container() {
        assert!(matches!(
            GlbContainer::parse(b"glTF"),
            Err(GlbError::InvalidContainer(_))
        ));
    }

    #[test]
    fn missing_bin_chunk() {
        let data = container(&[chunk(CHUNK_JSON, b"{}  ")]);
        assert!(matches!(
            GlbContainer::parse(&data),
            Err(GlbError::MissingChunk(ChunkKind::Bin))
        ));
    }

    #[test]
    fn missing_json_chunk() {
        let data = container(&[chunk(CHUNK_BIN, &[0; 4])]);
        assert!(matches!(
            GlbContainer::parse(&data),
            Err(GlbError::MissingChunk(ChunkKind::Json))
        ));
    }

    #[test]
    fn duplicate_json_chunk_is_rejected() {
        let data = container(&[
            chunk(CHUNK_JSON, b"{}  "),
            chunk(CHUNK_JSON, b"{}  "),
            chunk(CHUNK_BIN, &[0; 4]),
        ]);
        assert!(matches!(
            GlbContainer::parse(&data),
            Err(GlbError::InvalidContainer(_))
        ));
    }

    #[test]
    fn chunk_past_declared_length() {
        let mut data = container(&[chunk(CHUNK_JSON, b"{}  "), chunk(CHUNK_BIN, &[0; 4])]);
        // grow the BIN chunk length beyond the container
        let bin_header = HEADER_LENGTH + CHUNK_HEADER_LENGTH + 4;
        data[bin_header..bin_header + 4].copy_from_slice(&64u32.to_le_bytes());
        assert!(matches!(
            GlbContainer::parse(&data),
            Err(GlbError::InvalidContainer(_))
        ));
    }

    #[test]
    fn truncated_container() {
        let mut data = container(&[chunk(CHUNK_JSON, b"{}  "), chunk(CHUNK_BIN, &[0; 4])]);
        data.truncate(data.len() - 2);
        assert!(matches!(
            GlbContainer::parse(&data),
            Err(GlbError::InvalidContainer(_))
        ));
    }

    #[test]
    fn version_check_can_be_relaxed() {
        let mut data = container(&[chunk(CHUNK_JSON, b"{}  "), chunk(CHUNK_BIN, &[0; 4])]);
        data[4..8].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(
            GlbContainer::parse(&data),
            Err(GlbError::UnsupportedVersion(1))
        ));

        let relaxed = LoadOptions {
            strict_version: false,
            ..LoadOptions::default()
        };
        assert_eq!(GlbContainer::parse_with(&data, &relaxed).unwrap().version, 1);
    }

    #[test]
    fn written_container_parses_back() {
        let data = write_container(br#"{"a":1}"#, &[1, 2, 3]);
        assert_eq!(data.len() % 4, 0);
        let glb = GlbContainer::parse(&data).unwrap();
        assert_eq!(glb.json, br#"{"a":1} "#);
        assert_eq!(glb.bin, &[1, 2, 3, 0]);
    }
}
