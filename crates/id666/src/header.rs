// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use crate::metadata::{clean_text, decode_ascii};

/// Well defined magic field for an SPC file header
pub const SPC_MAGIC: &[u8; 33] = b"SNES-SPC700 Sound File Data v0.30";

/// Size of the fixed-layout portion of a file: 256-byte header region,
/// 64KB RAM payload, 128 DSP registers, 64 unused, 64 extra RAM. Anything
/// beyond this offset is extension data.
pub const BODY_SIZE: usize = 0x10200;

const SONG_TITLE: Field = Field { offset: 0x2E, width: 32 };
const GAME_TITLE: Field = Field { offset: 0x4E, width: 32 };
const DUMPER: Field = Field { offset: 0x6E, width: 16 };
const COMMENTS: Field = Field { offset: 0x7E, width: 32 };
const DUMP_DATE: Field = Field { offset: 0x9E, width: 11 };
const ARTIST: Field = Field { offset: 0xB1, width: 32 };

const DEFAULT_CHANNEL_DISABLES: usize = 0xD0;
const EMULATOR_USED: usize = 0xD1;

/// One fixed-offset, fixed-width, NUL-padded ASCII field in the legacy
/// tag block
struct Field {
    offset: usize,
    width: usize,
}

impl Field {
    /// Reads clamp to the image length so that truncated buffers decode
    /// to empty fields rather than failing.
    fn read(&self, image: &[u8]) -> String {
        let start = self.offset.min(image.len());
        let end = (self.offset + self.width).min(image.len());
        clean_text(&decode_ascii(&image[start..end]))
    }

    /// Truncates to the field width, NUL-pads, and never writes outside
    /// the field's range.
    fn write(&self, image: &mut [u8], value: &str) {
        let end = (self.offset + self.width).min(image.len());
        for (target, byte) in image[self.offset.min(end)..end]
            .iter_mut()
            .zip(value.bytes().chain(std::iter::repeat(0)))
        {
            *target = byte;
        }
    }
}

fn read_byte(image: &[u8], offset: usize) -> u8 {
    image.get(offset).copied().unwrap_or(0)
}

fn write_byte(image: &mut [u8], offset: usize, value: u8) {
    if let Some(byte) = image.get_mut(offset) {
        *byte = value;
    }
}

/// The legacy ID666 tag block, resident at fixed offsets 0x2E-0xD2 inside
/// the header region
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagBlock {
    pub song_title: String,
    pub game_title: String,
    pub dumper: String,
    pub comments: String,
    pub dump_date: String,
    pub artist: String,
    pub default_channel_disables: u8,
    pub emulator_used: u8,
}

impl TagBlock {
    /// Decode the legacy block from a file image.
    ///
    /// The magic check only applies to images large enough to hold the
    /// full fixed-layout body; shorter (truncated or synthetic) buffers
    /// decode in the legacy region alone.
    pub fn decode(image: &[u8]) -> Result<Self, DecodeError> {
        if image.len() >= BODY_SIZE && &image[..SPC_MAGIC.len()] != SPC_MAGIC {
            return Err(DecodeError::InvalidMagic);
        }

        Ok(Self {
            song_title: SONG_TITLE.read(image),
            game_title: GAME_TITLE.read(image),
            dumper: DUMPER.read(image),
            comments: COMMENTS.read(image),
            dump_date: DUMP_DATE.read(image),
            artist: ARTIST.read(image),
            default_channel_disables: read_byte(image, DEFAULT_CHANNEL_DISABLES),
            emulator_used: read_byte(image, EMULATOR_USED),
        })
    }

    /// Overwrite the legacy field ranges in place. The image length never
    /// changes and bytes outside the defined ranges are left alone.
    pub fn encode_into(&self, image: &mut [u8]) {
        SONG_TITLE.write(image, &self.song_title);
        GAME_TITLE.write(image, &self.game_title);
        DUMPER.write(image, &self.dumper);
        COMMENTS.write(image, &self.comments);
        DUMP_DATE.write(image, &self.dump_date);
        ARTIST.write(image, &self.artist);
        write_byte(image, DEFAULT_CHANNEL_DISABLES, self.default_channel_disables);
        write_byte(image, EMULATOR_USED, self.emulator_used);
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid magic")]
    InvalidMagic,
}

#[cfg(test)]
mod test {
    use super::*;

    fn image_with_magic() -> Vec<u8> {
        let mut image = vec![0u8; BODY_SIZE];
        image[..SPC_MAGIC.len()].copy_from_slice(SPC_MAGIC);
        image
    }

    #[test]
    fn magic_checked_only_on_full_body() {
        assert!(matches!(
            TagBlock::decode(&vec![0u8; BODY_SIZE]),
            Err(DecodeError::InvalidMagic)
        ));
        // One byte short of a full body skips the check entirely
        let block = TagBlock::decode(&vec![0u8; BODY_SIZE - 1]).expect("legacy-only decode");
        assert_eq!(block, TagBlock::default());
    }

    #[test]
    fn fields_roundtrip_at_fixed_offsets() {
        let mut image = image_with_magic();

        let block = TagBlock {
            song_title: "Dummy Song".into(),
            game_title: "Dummy Game".into(),
            dumper: "Someone".into(),
            comments: "A comment".into(),
            dump_date: "01/02/2024".into(),
            artist: "Composer".into(),
            default_channel_disables: 1,
            emulator_used: 2,
        };
        block.encode_into(&mut image);

        assert_eq!(&image[0x2E..0x2E + 10], b"Dummy Song");
        assert_eq!(&image[0x4E..0x4E + 10], b"Dummy Game");
        assert_eq!(image[0x2E + 10], 0);
        assert_eq!(image[0xD0], 1);
        assert_eq!(image[0xD1], 2);

        assert_eq!(TagBlock::decode(&image).expect("valid image"), block);
    }

    #[test]
    fn oversized_values_truncate_to_field_width() {
        let mut image = image_with_magic();

        let block = TagBlock {
            dumper: "seventeen chars!!".into(),
            ..Default::default()
        };
        block.encode_into(&mut image);

        // 16-byte field: the final '!' never lands
        assert_eq!(&image[0x6E..0x7E], b"seventeen chars!");
        assert_eq!(image[0x7E], 0);
    }
}
