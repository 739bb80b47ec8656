// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Every tag the codec knows how to read and write, across both the
/// legacy block and the extension chunk.
///
/// Display/parse names are the camelCase field names the format's
/// existing tooling exposes (`songTitle`, `ostTrack`, ...). Declaration
/// order is legacy-block layout order followed by extension id order,
/// which is the order tags are printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display, strum::EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum TagKey {
    SongTitle,
    GameTitle,
    Dumper,
    Comments,
    DumpDate,
    Artist,
    DefaultChannelDisables,
    EmulatorUsed,
    Ost,
    OstDisc,
    OstTrack,
    PublisherName,
    CopyrightYear,
    IntroLength,
    LoopLength,
    EndLength,
    FadeLength,
    MutedChannels,
    LoopCount,
    Amplification,
}

impl TagKey {
    /// The value encoding this key binds to.
    ///
    /// `ostTrack` is text: it composes a track number with an optional
    /// printable suffix character ("11C").
    pub fn value_kind(self) -> ValueKind {
        match self {
            TagKey::SongTitle
            | TagKey::GameTitle
            | TagKey::Dumper
            | TagKey::Comments
            | TagKey::DumpDate
            | TagKey::Artist
            | TagKey::Ost
            | TagKey::OstTrack
            | TagKey::PublisherName => ValueKind::Text,
            TagKey::DefaultChannelDisables | TagKey::EmulatorUsed => ValueKind::Byte,
            TagKey::OstDisc
            | TagKey::CopyrightYear
            | TagKey::IntroLength
            | TagKey::LoopLength
            | TagKey::EndLength
            | TagKey::FadeLength
            | TagKey::MutedChannels
            | TagKey::LoopCount
            | TagKey::Amplification => ValueKind::Integer,
        }
    }

    /// Coerce a raw string (as supplied on a CLI) into this key's typed
    /// value. Numeric coercion is explicit and fallible; unparsable
    /// numerics are an error, never a silent zero.
    pub fn parse_value(self, raw: &str) -> Result<TagValue, ParseValueError> {
        let invalid = || ParseValueError::InvalidInteger {
            key: self,
            value: raw.to_owned(),
        };

        Ok(match self.value_kind() {
            ValueKind::Text => TagValue::Text(raw.to_owned()),
            ValueKind::Integer => TagValue::Integer(raw.trim().parse().map_err(|_| invalid())?),
            ValueKind::Byte => TagValue::Byte(raw.trim().parse().map_err(|_| invalid())?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Byte,
}

/// A decoded tag value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Text(String),
    Integer(u32),
    Byte(u8),
}

impl TagValue {
    /// Presence test used when rebuilding the extension chunk: empty
    /// strings and zero integers are treated as absent.
    pub fn is_truthy(&self) -> bool {
        match self {
            TagValue::Text(s) => !s.is_empty(),
            TagValue::Integer(i) => *i != 0,
            TagValue::Byte(b) => *b != 0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if let TagValue::Text(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_integer(&self) -> Option<u32> {
        match self {
            TagValue::Integer(i) => Some(*i),
            TagValue::Byte(b) => Some(u32::from(*b)),
            TagValue::Text(_) => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Text(s) => f.write_str(s),
            TagValue::Integer(i) => write!(f, "{i}"),
            TagValue::Byte(b) => write!(f, "{b}"),
        }
    }
}

/// An extension sub-chunk whose id is outside the known table, preserved
/// for observability only. Never re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub id: u8,
    pub kind: u8,
    pub value: TagValue,
}

impl UnknownField {
    /// Synthesized key, e.g. `unknown_34_type_0` (id in decimal)
    pub fn key(&self) -> String {
        format!("unknown_{}_type_{}", self.id, self.kind)
    }
}

/// The flat tag-name to value mapping produced by decoding and consumed
/// by encoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    fields: BTreeMap<TagKey, TagValue>,
    unknown: Vec<UnknownField>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: TagKey) -> Option<&TagValue> {
        self.fields.get(&key)
    }

    pub fn insert(&mut self, key: TagKey, value: TagValue) {
        self.fields.insert(key, value);
    }

    /// Coerce and insert one raw `name = value` entry, e.g. from CLI
    /// arguments.
    pub fn parse_entry(&mut self, key: &str, value: &str) -> Result<(), ParseValueError> {
        let key = key
            .parse::<TagKey>()
            .map_err(|_| ParseValueError::UnknownKey(key.to_owned()))?;
        self.insert(key, key.parse_value(value)?);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagKey, &TagValue)> + '_ {
        self.fields.iter().map(|(key, value)| (*key, value))
    }

    pub fn unknown(&self) -> &[UnknownField] {
        &self.unknown
    }

    pub(crate) fn push_unknown(&mut self, field: UnknownField) {
        self.unknown.push(field);
    }

    /// Shallow merge: `updates` wins on key collision. Unknown-field
    /// diagnostics always come from `self` (the decoded image).
    pub fn merged_with(&self, updates: &Metadata) -> Metadata {
        let mut merged = self.clone();
        for (key, value) in updates.iter() {
            merged.insert(key, value.clone());
        }
        merged
    }

    pub fn text(&self, key: TagKey) -> Option<&str> {
        self.get(key).and_then(TagValue::as_text)
    }

    pub fn integer(&self, key: TagKey) -> Option<u32> {
        self.get(key).and_then(TagValue::as_integer)
    }
}

#[derive(Debug, Error)]
pub enum ParseValueError {
    #[error("Unknown tag key: {0}")]
    UnknownKey(String),
    #[error("Tag `{key}` expects an integer, got `{value}`")]
    InvalidInteger { key: TagKey, value: String },
}

/// Decode bytes the way the format's tooling always has: plain ASCII with
/// the high bit dropped.
pub(crate) fn decode_ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| char::from(byte & 0x7F)).collect()
}

/// Trim surrounding whitespace and strip NUL padding
pub(crate) fn clean_text(text: &str) -> String {
    text.trim().replace('\0', "")
}
