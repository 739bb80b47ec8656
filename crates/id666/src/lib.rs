// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

//! Reader/writer for ID666 metadata embedded in SPC sound files: the
//! fixed-offset legacy tag block in the file header and the optional
//! `xid6` extension chunk appended after the fixed-layout body.
//!
//! The codec is pure: it decodes from and encodes to in-memory byte
//! buffers and performs no I/O of its own.

pub(crate) mod ext;
pub mod header;
pub mod metadata;
pub mod read;
pub mod write;
pub mod xid6;

pub use self::header::{TagBlock, BODY_SIZE, SPC_MAGIC};
pub use self::metadata::{Metadata, ParseValueError, TagKey, TagValue, UnknownField, ValueKind};
pub use self::read::{decode, DecodeError};
pub use self::write::{encode, EncodeError};

#[cfg(test)]
pub(crate) mod testutil {
    use crate::ext::WriteExt;
    use crate::header::{BODY_SIZE, SPC_MAGIC};
    use crate::xid6::XID6_MAGIC;

    /// A minimal valid file image: fixed-layout body, zero-filled, with
    /// the magic string in place
    pub fn base_image() -> Vec<u8> {
        let mut image = vec![0u8; BODY_SIZE];
        image[..SPC_MAGIC.len()].copy_from_slice(SPC_MAGIC);
        image
    }

    /// `base_image` with an extension chunk holding `body` verbatim (the
    /// declared size is the body length, as the format's writer produces)
    pub fn with_chunk(body: &[u8]) -> Vec<u8> {
        let mut image = base_image();
        image.extend_from_slice(XID6_MAGIC);
        image.write_u32(body.len() as u32).expect("vec write");
        image.extend_from_slice(body);
        image
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::base_image;

    #[test]
    fn roundtrip() {
        let mut image = base_image();
        image[0x2E..0x2E + 10].copy_from_slice(b"Dummy Song");
        image[0x4E..0x4E + 10].copy_from_slice(b"Dummy Game");

        let metadata = decode(&image).expect("valid image");
        assert_eq!(metadata.text(TagKey::SongTitle), Some("Dummy Song"));
        assert_eq!(metadata.text(TagKey::GameTitle), Some("Dummy Game"));

        let mut updates = Metadata::new();
        updates.parse_entry("ost", "Foo").expect("valid entry");
        let encoded = encode(&image, &updates).expect("encode");

        // The chunk grows the file by a whole number of 32-bit words
        assert!(encoded.len() > image.len());
        assert_eq!((encoded.len() - image.len()) % 4, 0);

        let reread = decode(&encoded).expect("valid image");
        assert_eq!(reread.text(TagKey::Ost), Some("Foo"));
        assert_eq!(reread.text(TagKey::SongTitle), Some("Dummy Song"));

        // Encoding with no updates preserves every readable tag
        let rewritten = encode(&encoded, &Metadata::new()).expect("encode");
        assert_eq!(decode(&rewritten).expect("valid image"), reread);
    }
}
