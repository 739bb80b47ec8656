// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{arg, ArgMatches, Command};
use thiserror::Error;

pub fn command() -> Command {
    Command::new("read")
        .about("Print ID666 tags")
        .long_about("Decode and print every known tag from local `.spc` files, plus any unrecognized extension sub-chunks")
        .arg(arg!(<PATH> ... "files to read").value_parser(clap::value_parser!(PathBuf)))
}

/// Decode the given .spc files and print their tags
pub fn handle(args: &ArgMatches) -> Result<(), Error> {
    let paths = args
        .get_many::<PathBuf>("PATH")
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    for path in paths {
        let image = fs_err::read(path).map_err(Error::IO)?;
        let metadata = id666::decode(&image).map_err(Error::Format)?;

        println!("{}:", path.display());
        print_tags(&metadata);
    }

    Ok(())
}

pub(super) fn print_tags(metadata: &id666::Metadata) {
    for (key, value) in metadata.iter() {
        println!("  {key} = {value}");
    }
    for unknown in metadata.unknown() {
        println!("  {} = {}", unknown.key(), unknown.value);
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Read failure")]
    IO(#[from] std::io::Error),

    #[error("Format failure")]
    Format(#[from] id666::DecodeError),
}
