// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Cursor};

use log::warn;
use thiserror::Error;

use crate::ext::ReadExt;
use crate::header::{self, TagBlock};
use crate::metadata::{clean_text, decode_ascii, Metadata, TagKey, TagValue, UnknownField, ValueKind};
use crate::xid6::{self, align_up, SubChunkData, ALIGN, DETECT_OFFSET, XID6_MAGIC};

/// Decode both tag regions of an in-memory file image into a flat
/// metadata map. Read-only: the image is never mutated.
pub fn decode(image: &[u8]) -> Result<Metadata, DecodeError> {
    let block = TagBlock::decode(image)?;

    let mut metadata = Metadata::new();
    metadata.insert(TagKey::SongTitle, TagValue::Text(block.song_title));
    metadata.insert(TagKey::GameTitle, TagValue::Text(block.game_title));
    metadata.insert(TagKey::Dumper, TagValue::Text(block.dumper));
    metadata.insert(TagKey::Comments, TagValue::Text(block.comments));
    metadata.insert(TagKey::DumpDate, TagValue::Text(block.dump_date));
    metadata.insert(TagKey::Artist, TagValue::Text(block.artist));
    metadata.insert(
        TagKey::DefaultChannelDisables,
        TagValue::Byte(block.default_channel_disables),
    );
    metadata.insert(TagKey::EmulatorUsed, TagValue::Byte(block.emulator_used));

    decode_extension(image, &mut metadata)?;

    Ok(metadata)
}

/// Walk the extension chunk, if one starts exactly at the detect offset.
///
/// If the declared size overruns the buffer the walk is skipped entirely;
/// no partial parse is attempted.
fn decode_extension(image: &[u8], metadata: &mut Metadata) -> Result<(), DecodeError> {
    if image.len() <= DETECT_OFFSET + 4 || &image[DETECT_OFFSET..DETECT_OFFSET + 4] != XID6_MAGIC {
        return Ok(());
    }

    let mut reader = Cursor::new(image);
    reader.set_position((DETECT_OFFSET + 4) as u64);
    let declared_size = reader.read_u32()? as usize;

    // The size field itself counts against the declared total
    let mut bytes_read = 4;
    if image.len() < DETECT_OFFSET + 4 + declared_size || bytes_read >= declared_size {
        return Ok(());
    }

    while (reader.position() as usize) < image.len() && bytes_read < declared_size {
        let id = reader.read_u8()?;
        let kind = reader.read_u8()?;

        let data = match kind {
            0 => SubChunkData::Length(reader.read_u16()?),
            1 => {
                let length = reader.read_u16()? as usize;
                let start = reader.position() as usize;
                // Clamp runaway lengths to the buffer; the loop condition
                // terminates the walk right after
                let end = (start + length).min(image.len());
                let text = clean_text(&decode_ascii(&image[start.min(end)..end]));
                reader.set_position((start + length) as u64);
                SubChunkData::Text(text)
            }
            4 => {
                let _length = reader.read_u16()?;
                SubChunkData::Integer(reader.read_u32()?)
            }
            k => return Err(xid6::DecodeError::UnknownKind(k).into()),
        };

        reader.set_position(align_up(reader.position() as usize, ALIGN) as u64);
        bytes_read = reader.position() as usize - (DETECT_OFFSET + 4);

        dispatch(metadata, image, reader.position() as usize, id, kind, data);
    }

    Ok(())
}

/// Map one decoded sub-chunk onto its named field. `cursor` is the
/// aligned offset just past the sub-chunk.
fn dispatch(metadata: &mut Metadata, image: &[u8], cursor: usize, id: u8, kind: u8, data: SubChunkData) {
    let value = match data {
        SubChunkData::Length(v) => TagValue::Integer(u32::from(v)),
        SubChunkData::Integer(v) => TagValue::Integer(v),
        SubChunkData::Text(s) => TagValue::Text(s),
    };

    let key = match id {
        0x10 => TagKey::Ost,
        0x11 => TagKey::OstDisc,
        0x12 => {
            metadata.insert(TagKey::OstTrack, TagValue::Text(compose_track(image, cursor)));
            return;
        }
        0x13 => TagKey::PublisherName,
        0x14 => TagKey::CopyrightYear,
        0x30 => TagKey::IntroLength,
        0x31 => TagKey::LoopLength,
        0x32 => TagKey::EndLength,
        0x33 => TagKey::FadeLength,
        0x34 => TagKey::MutedChannels,
        0x35 => TagKey::LoopCount,
        0x36 => TagKey::Amplification,
        _ => {
            warn!("unrecognized extension sub-chunk id {id:#04x} (kind {kind})");
            metadata.push_unknown(UnknownField { id, kind, value });
            return;
        }
    };

    let value = match (key.value_kind(), value) {
        // A numeric payload under a text key renders as text
        (ValueKind::Text, TagValue::Integer(v)) => TagValue::Text(v.to_string()),
        (_, value) => value,
    };

    metadata.insert(key, value);
}

/// OST track (id 0x12): the value's upper byte is the track number, the
/// lower byte an optional printable-ASCII suffix. Re-reads the two bytes
/// just behind the aligned cursor, the way the format's tooling does.
fn compose_track(image: &[u8], cursor: usize) -> String {
    let byte_behind = |distance: usize| {
        cursor
            .checked_sub(distance)
            .and_then(|offset| image.get(offset))
            .copied()
            .unwrap_or(0)
    };

    let number = byte_behind(1);
    let suffix = byte_behind(2);

    let mut track = number.to_string();
    if (0x20..=0x7E).contains(&suffix) {
        track.push(char::from(suffix));
    }
    track
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("header decode")]
    Header(#[from] header::DecodeError),
    #[error("sub-chunk decode")]
    SubChunk(#[from] xid6::DecodeError),
    #[error("io")]
    Io(#[from] io::Error),
}
