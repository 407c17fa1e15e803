#![deny(unused_must_use)]

use std::ffi::OsString;

pub const USAGE: &str = "echo JSON | envjson child";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing required argument CHILD")]
    MissingCommand,
    #[error(transparent)]
    Lexopt(#[from] lexopt::Error),
}

/// The child to run, exactly as it was given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: OsString,
    pub args: Vec<OsString>,
}

/// Splits the command line into the child program and its arguments.
///
/// `args` must not include the name envjson itself was invoked as. Nothing is
/// interpreted as an option: an argument that looks like a flag is either the
/// child program or one of its arguments.
pub fn parse(args: impl IntoIterator<Item = OsString>) -> Result<Command, Error> {
    let mut parser = lexopt::Parser::from_args(args);
    let mut raw = parser.raw_args()?;

    let program = raw.next().ok_or(Error::MissingCommand)?;
    let args = raw.collect();

    Ok(Command { program, args })
}

/// Same as [`parse`], reading from the arguments of the current process.
pub fn from_env() -> Result<Command, Error> {
    parse(std::env::args_os().skip(1))
}
