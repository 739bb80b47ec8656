// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{arg, ArgMatches, Command};
use thiserror::Error;

use super::read::print_tags;

pub fn command() -> Command {
    Command::new("write")
        .about("Edit a single ID666 tag")
        .long_about("Apply one `key=value` update to a local `.spc` file and rewrite it in place")
        .arg(arg!(<TAG> "update in `key=value` form, e.g. songTitle=Foo"))
        .arg(arg!(<PATH> "file to edit").value_parser(clap::value_parser!(PathBuf)))
}

/// Merge one tag update into the given .spc file
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let Some(tag) = args.get_one::<String>("TAG") else {
        unreachable!()
    };
    let Some(path) = args.get_one::<PathBuf>("PATH") else {
        unreachable!()
    };

    let (key, value) = tag
        .split_once('=')
        .ok_or_else(|| Error::MalformedTag(tag.clone()))?;

    let mut updates = id666::Metadata::new();
    updates.parse_entry(key, value)?;

    let image = fs_err::read(path).map_err(Error::IO)?;

    println!("Tags before edit:");
    print_tags(&id666::decode(&image).map_err(Error::Format)?);

    let encoded = id666::encode(&image, &updates).map_err(Error::Encode)?;
    fs_err::write(path, &encoded).map_err(Error::IO)?;

    println!("Tags after edit:");
    print_tags(&id666::decode(&encoded).map_err(Error::Format)?);

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Expected `key=value`, got `{0}`")]
    MalformedTag(String),

    #[error("Invalid tag value")]
    Value(#[from] id666::ParseValueError),

    #[error("Read failure")]
    IO(#[from] std::io::Error),

    #[error("Format failure")]
    Format(#[from] id666::DecodeError),

    #[error("Encode failure")]
    Encode(#[from] id666::EncodeError),
}
