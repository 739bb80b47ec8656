// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Cursor};

use regex::Regex;
use thiserror::Error;

use crate::ext::ReadExt;
use crate::header::TagBlock;
use crate::metadata::{Metadata, TagKey, TagValue};
use crate::read::{self, decode};
use crate::xid6::{self, SubChunk, SubChunkData, SubChunkId, SEARCH_OFFSET, XID6_MAGIC};

/// The extension items the encoder can rebuild, in the fixed id-ascending
/// order they are emitted in
const EMISSION_ORDER: [(SubChunkId, TagKey); 12] = [
    (SubChunkId::Ost, TagKey::Ost),
    (SubChunkId::OstDisc, TagKey::OstDisc),
    (SubChunkId::OstTrack, TagKey::OstTrack),
    (SubChunkId::PublisherName, TagKey::PublisherName),
    (SubChunkId::CopyrightYear, TagKey::CopyrightYear),
    (SubChunkId::IntroLength, TagKey::IntroLength),
    (SubChunkId::LoopLength, TagKey::LoopLength),
    (SubChunkId::EndLength, TagKey::EndLength),
    (SubChunkId::FadeLength, TagKey::FadeLength),
    (SubChunkId::MutedChannels, TagKey::MutedChannels),
    (SubChunkId::LoopCount, TagKey::LoopCount),
    (SubChunkId::Amplification, TagKey::Amplification),
];

/// Produce a new image with `updates` merged over the tags already in
/// `image` (updates win), the legacy block rewritten in place, and the
/// extension chunk rebuilt from scratch for the known keys present in the
/// merged map. The input is never mutated.
pub fn encode(image: &[u8], updates: &Metadata) -> Result<Vec<u8>, EncodeError> {
    let merged = decode(image)?.merged_with(updates);

    let mut out = image.to_vec();
    tag_block(&merged).encode_into(&mut out);

    let sub_chunks = collect_sub_chunks(&merged)?;
    if sub_chunks.is_empty() {
        // No extension keys: legacy block only, any existing chunk is
        // left untouched
        return Ok(out);
    }

    let chunk = xid6::build_chunk(&sub_chunks)?;
    splice_chunk(out, &chunk)
}

fn tag_block(merged: &Metadata) -> TagBlock {
    let text = |key| merged.text(key).unwrap_or_default().to_owned();
    let byte = |key| merged.integer(key).unwrap_or(0) as u8;

    TagBlock {
        song_title: text(TagKey::SongTitle),
        game_title: text(TagKey::GameTitle),
        dumper: text(TagKey::Dumper),
        comments: text(TagKey::Comments),
        dump_date: text(TagKey::DumpDate),
        artist: text(TagKey::Artist),
        default_channel_disables: byte(TagKey::DefaultChannelDisables),
        emulator_used: byte(TagKey::EmulatorUsed),
    }
}

/// Build the sub-chunk records for every known extension key present in
/// the merged map. Empty strings and zero integers are treated as absent,
/// with three exceptions that emit zero: `mutedChannels` (zero is a
/// meaningful mask), and `ostDisc`/`copyrightYear` (the format's tooling
/// handles these as strings, and `"0"` counts as present).
fn collect_sub_chunks(merged: &Metadata) -> Result<Vec<SubChunk>, EncodeError> {
    let mut sub_chunks = Vec::new();

    for (id, key) in EMISSION_ORDER {
        let Some(value) = merged.get(key) else {
            continue;
        };
        let zero_emits = matches!(
            key,
            TagKey::MutedChannels | TagKey::OstDisc | TagKey::CopyrightYear
        );
        if !value.is_truthy() && !zero_emits {
            continue;
        }

        let data = match id {
            SubChunkId::Ost | SubChunkId::PublisherName => SubChunkData::Text(text_value(value)),
            SubChunkId::OstTrack => SubChunkData::Length(pack_track(key, value)?),
            SubChunkId::OstDisc
            | SubChunkId::CopyrightYear
            | SubChunkId::MutedChannels
            | SubChunkId::LoopCount => SubChunkData::Length(length_value(key, value)?),
            SubChunkId::IntroLength
            | SubChunkId::LoopLength
            | SubChunkId::EndLength
            | SubChunkId::FadeLength
            | SubChunkId::Amplification => SubChunkData::Integer(integer_value(key, value)?),
        };

        sub_chunks.push(SubChunk::new(id, data));
    }

    Ok(sub_chunks)
}

fn text_value(value: &TagValue) -> String {
    match value {
        TagValue::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Explicit numeric coercion: a text value bound to an integer key must
/// parse cleanly, never fall back to a sentinel.
fn integer_value(key: TagKey, value: &TagValue) -> Result<u32, EncodeError> {
    value
        .as_integer()
        .or_else(|| value.as_text()?.trim().parse().ok())
        .ok_or_else(|| EncodeError::InvalidInteger {
            key,
            value: value.to_string(),
        })
}

/// 16-bit variant for values stored directly in the header's length
/// field. Out-of-range values are rejected rather than truncated.
fn length_value(key: TagKey, value: &TagValue) -> Result<u16, EncodeError> {
    u16::try_from(integer_value(key, value)?).map_err(|_| EncodeError::InvalidInteger {
        key,
        value: value.to_string(),
    })
}

/// Pack an OST track value ("11", "11C") into the 16-bit on-disk form:
/// track number in the upper byte, optional printable-ASCII suffix in the
/// lower. Values that don't match the pattern lose their non-digit
/// characters and any suffix; values with no digits at all, or a track
/// number that won't fit a byte, are an error.
fn pack_track(key: TagKey, value: &TagValue) -> Result<u16, EncodeError> {
    let invalid = || EncodeError::InvalidInteger {
        key,
        value: value.to_string(),
    };

    let text = text_value(value);
    let pattern = Regex::new(r"^(\d+)([\x20-\x7E]?)$").expect("static pattern");

    let (digits, suffix) = match pattern.captures(&text) {
        Some(captures) => (
            captures[1].to_owned(),
            captures.get(2).and_then(|m| m.as_str().chars().next()),
        ),
        None => (text.chars().filter(char::is_ascii_digit).collect(), None),
    };

    let number = digits.parse::<u16>().ok().filter(|n| *n <= 0xFF).ok_or_else(invalid)?;
    let suffix = suffix.map(|c| c as u16).unwrap_or(0);

    Ok((number << 8) | suffix)
}

/// Replace an existing extension chunk or append a new one.
///
/// The search anchor is the start of the extra-RAM region (0x101C0), not
/// the decoder's detect offset, and the existing chunk's declared size is
/// read big-endian. Both quirks match the format's existing tooling.
fn splice_chunk(image: Vec<u8>, chunk: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let Some(offset) = find_chunk(&image) else {
        let mut out = image;
        out.extend_from_slice(chunk);
        return Ok(out);
    };

    let mut reader = Cursor::new(image.as_slice());
    reader.set_position((offset + 4) as u64);
    let old_size = reader.read_u32_be()? as usize;

    let tail_start = (offset + 8 + old_size).min(image.len());

    let mut out = Vec::with_capacity(offset + chunk.len() + (image.len() - tail_start));
    out.extend_from_slice(&image[..offset]);
    out.extend_from_slice(chunk);
    out.extend_from_slice(&image[tail_start..]);
    Ok(out)
}

fn find_chunk(image: &[u8]) -> Option<usize> {
    image
        .get(SEARCH_OFFSET..)?
        .windows(XID6_MAGIC.len())
        .position(|window| window == XID6_MAGIC)
        .map(|position| position + SEARCH_OFFSET)
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("decode")]
    Decode(#[from] read::DecodeError),
    #[error("chunk encode")]
    Chunk(#[from] xid6::EncodeError),
    #[error("Tag `{key}` expects an integer value, got `{value}`")]
    InvalidInteger { key: TagKey, value: String },
    #[error("io")]
    Io(#[from] io::Error),
}
