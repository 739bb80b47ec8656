// SPDX-FileCopyrightText: Copyright © 2025 spc-tag developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, Command};
use thiserror::Error;

mod read;
mod version;
mod write;

/// Generate the CLI command structure
fn command() -> Command {
    Command::new("spc-tag")
        .about("Read and edit ID666 tags in SPC sound files")
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::SetTrue),
        )
        .arg_required_else_help(true)
        .subcommand(read::command())
        .subcommand(write::command())
        .subcommand(version::command())
}

/// Process all CLI arguments
pub fn process() -> Result<(), Error> {
    let matches = command().get_matches();
    if matches.get_flag("version") {
        version::print();
        return Ok(());
    }
    match matches.subcommand() {
        Some(("read", args)) => read::handle(args).map_err(Error::Read),
        Some(("write", args)) => write::handle(args).map_err(Error::Write),
        Some(("version", _)) => {
            version::print();
            Ok(())
        }
        _ => unreachable!(),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("error handling read: {0}")]
    Read(#[from] read::Error),

    #[error("error handling write: {0}")]
    Write(#[from] write::Error),
}
