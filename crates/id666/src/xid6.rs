// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Write};

use thiserror::Error;

use crate::ext::WriteExt;
use crate::header;

/// Chunk type tag for the extended ID666 area
pub const XID6_MAGIC: &[u8; 4] = b"xid6";

/// The decoder only recognises an extension chunk starting exactly at the
/// end of the fixed-layout body.
pub const DETECT_OFFSET: usize = header::BODY_SIZE;

/// First sub-chunk offset: detect offset + 4-byte magic + 4-byte size
pub const SUB_CHUNKS_OFFSET: usize = DETECT_OFFSET + 8;

/// The rewrite path searches for an existing chunk from the start of the
/// extra-RAM region instead of `DETECT_OFFSET`. The format's existing
/// tooling has always used this anchor, so chunks sitting in the final 64
/// bytes of the body are found by replacement but never by the decoder.
pub const SEARCH_OFFSET: usize = 0x101C0;

/// Sub-chunk payloads pad out to 32-bit boundaries
pub const ALIGN: usize = 4;

pub(crate) fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Ids of the extension items the codec re-encodes. Unlisted ids decode
/// into the unknown-field side channel.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubChunkId {
    /// Official soundtrack title
    Ost = 0x10,
    /// OST disc number
    OstDisc = 0x11,
    /// OST track: number in the upper byte, optional printable ASCII
    /// suffix in the lower byte
    OstTrack = 0x12,
    /// Publisher's name
    PublisherName = 0x13,
    /// Copyright year
    CopyrightYear = 0x14,
    /// Introduction length in ticks (1/64000th of a second)
    IntroLength = 0x30,
    /// Loop length in ticks
    LoopLength = 0x31,
    /// End length in ticks
    EndLength = 0x32,
    /// Fade length in ticks
    FadeLength = 0x33,
    /// Bitmask of muted channels
    MutedChannels = 0x34,
    /// Times to play the loop section
    LoopCount = 0x35,
    /// Output amplification (65536 = normal)
    Amplification = 0x36,
}

/// Value encodings a sub-chunk can carry, discriminated by the type byte
/// in its header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubChunkData {
    /// Type 0: a 16-bit value stored directly in the header's length
    /// field, no trailing data
    Length(u16),
    /// Type 1: NUL-terminated ASCII text after the header
    Text(String),
    /// Type 4: a 4-byte integer after the header
    Integer(u32),
}

impl SubChunkData {
    pub fn kind(&self) -> u8 {
        match self {
            SubChunkData::Length(_) => 0,
            SubChunkData::Text(_) => 1,
            SubChunkData::Integer(_) => 4,
        }
    }

    /// Trailing data length before alignment
    fn data_len(&self) -> usize {
        match self {
            SubChunkData::Length(_) => 0,
            // nul terminator
            SubChunkData::Text(s) => s.len() + 1,
            SubChunkData::Integer(_) => 4,
        }
    }
}

/// One typed, length-delimited, 32-bit-aligned record inside the
/// extension chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubChunk {
    pub id: u8,
    pub data: SubChunkData,
}

impl SubChunk {
    pub fn new(id: SubChunkId, data: SubChunkData) -> Self {
        Self { id: id as u8, data }
    }

    /// Total encoded size: 4-byte header, trailing data, alignment
    /// padding. Always a multiple of 4.
    pub fn size(&self) -> usize {
        align_up(4 + self.data.data_len(), ALIGN)
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u8(self.id)?;
        writer.write_u8(self.data.kind())?;

        match &self.data {
            SubChunkData::Length(value) => writer.write_u16(*value)?,
            SubChunkData::Text(s) => {
                let data_len = s.len() + 1;
                let length =
                    u16::try_from(data_len).map_err(|_| EncodeError::TextTooLong(s.len()))?;
                writer.write_u16(length)?;
                writer.write_all(s.as_bytes())?;
                for _ in 0..align_up(data_len, ALIGN) - s.len() {
                    writer.write_u8(0)?;
                }
            }
            SubChunkData::Integer(value) => {
                writer.write_u16(4)?;
                writer.write_u32(*value)?;
            }
        }

        Ok(())
    }
}

/// Serialize sub-chunks into a complete on-disk chunk, header included.
///
/// Sub-chunks land 4-byte aligned. The body then gains extra padding so
/// the *final* sub-chunk's length becomes a multiple of 8. That rule and
/// the reader's byte accounting (which pre-counts the 4-byte size field)
/// are a matched pair: the padding is exactly what keeps a 4-byte
/// trailing sub-chunk visible to the reader while keeping the padding
/// itself out of the walk. Pad against the whole body instead and either
/// the last sub-chunk is dropped on read-back or the padding decodes as
/// a spurious record.
///
/// One corner: the format's tooling serializes the soundtrack title
/// (0x10) down a separate path, so the padding keys off the last
/// sub-chunk *other than* it. A chunk holding only the soundtrack title
/// gets no trailing padding at all; text sub-chunks are always at least
/// 8 bytes, so the reader still sees the whole chunk.
pub fn build_chunk(sub_chunks: &[SubChunk]) -> Result<Vec<u8>, EncodeError> {
    let mut body = Vec::with_capacity(sub_chunks.iter().map(SubChunk::size).sum());

    for sub_chunk in sub_chunks {
        sub_chunk.encode(&mut body)?;
    }
    let pad_source = sub_chunks
        .iter()
        .rev()
        .find(|sub_chunk| sub_chunk.id != SubChunkId::Ost as u8);
    if let Some(last) = pad_source {
        body.resize(body.len() + (align_up(last.size(), 8) - last.size()), 0);
    }

    let declared_size = align_up(body.len(), ALIGN) as u32;

    let mut chunk = Vec::with_capacity(8 + body.len());
    chunk.write_array(*XID6_MAGIC)?;
    chunk.write_u32(declared_size)?;
    chunk.extend(body);

    Ok(chunk)
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unknown sub-chunk kind: {0}")]
    UnknownKind(u8),
    #[error("io")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Text value of {0} bytes overflows the 16-bit length field")]
    TextTooLong(usize),
    #[error("io")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sub_chunks_align_to_four_bytes() {
        let length = SubChunk::new(SubChunkId::OstDisc, SubChunkData::Length(2));
        let integer = SubChunk::new(SubChunkId::IntroLength, SubChunkData::Integer(64_000));
        let text = SubChunk::new(SubChunkId::Ost, SubChunkData::Text("Foo".into()));

        assert_eq!(length.size(), 4);
        assert_eq!(integer.size(), 12);
        // header + "Foo\0" lands on a boundary already
        assert_eq!(text.size(), 8);

        for sub_chunk in [length, integer, text] {
            let mut bytes = vec![];
            sub_chunk.encode(&mut bytes).expect("encode sub-chunk");
            assert_eq!(bytes.len(), sub_chunk.size());
            assert_eq!(bytes.len() % ALIGN, 0);
        }
    }

    #[test]
    fn text_encoding_nul_terminates_and_pads() {
        let sub_chunk = SubChunk::new(SubChunkId::PublisherName, SubChunkData::Text("Nintendo".into()));
        let mut bytes = vec![];
        sub_chunk.encode(&mut bytes).expect("encode sub-chunk");

        // 9 = "Nintendo" + nul, then 3 pad bytes
        assert_eq!(bytes, b"\x13\x01\x09\x00Nintendo\0\0\0\0");
    }

    #[test]
    fn trailing_sub_chunk_pads_to_eight_bytes() {
        let chunk = build_chunk(&[SubChunk::new(SubChunkId::OstDisc, SubChunkData::Length(1))])
            .expect("build chunk");

        assert_eq!(&chunk[..4], XID6_MAGIC);
        // 4-byte sub-chunk padded to 8, declared as 8
        assert_eq!(u32::from_le_bytes(chunk[4..8].try_into().unwrap()), 8);
        assert_eq!(chunk.len(), 16);
        assert_eq!(chunk.len() % 4, 0);
    }

    #[test]
    fn soundtrack_only_chunk_gets_no_trailing_padding() {
        let chunk = build_chunk(&[SubChunk::new(SubChunkId::Ost, SubChunkData::Text("Foobar".into()))])
            .expect("build chunk");

        // 4 + 7 data aligns to 12; the 8-byte rule never applies to a
        // lone soundtrack title
        assert_eq!(u32::from_le_bytes(chunk[4..8].try_into().unwrap()), 12);
        assert_eq!(chunk.len(), 20);
    }

    #[test]
    fn oversized_text_is_rejected() {
        let sub_chunk = SubChunk::new(SubChunkId::Ost, SubChunkData::Text("x".repeat(0x1_0000)));
        assert!(matches!(
            sub_chunk.encode(&mut vec![]),
            Err(EncodeError::TextTooLong(0x1_0000))
        ));
    }

    #[test]
    fn no_extra_padding_when_trailing_sub_chunk_is_eight_aligned() {
        let chunk = build_chunk(&[
            SubChunk::new(SubChunkId::LoopCount, SubChunkData::Length(2)),
            SubChunk::new(SubChunkId::Amplification, SubChunkData::Integer(65_536)),
        ])
        .expect("build chunk");

        // 4 + 8 body, trailing sub-chunk already a multiple of 8
        assert_eq!(u32::from_le_bytes(chunk[4..8].try_into().unwrap()), 12);
        assert_eq!(chunk.len(), 20);
    }
}
