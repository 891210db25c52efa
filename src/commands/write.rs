//! Implementation of the `portalock write` command.

use crate::cli::WriteArgs;
use portalock::error::Result;
use portalock::exit_codes;
use portalock::fs::open_atomic;
use std::io;

/// Execute the `portalock write` command.
///
/// Streams stdin into a temporary file next to the target and renames it
/// into place once stdin is exhausted. On any failure the target keeps its
/// old content.
pub fn cmd_write(args: WriteArgs) -> Result<i32> {
    let bytes = open_atomic(&args.target, |file| io::copy(&mut io::stdin().lock(), file))?;
    tracing::debug!(path = %args.target.display(), bytes, "file replaced");
    Ok(exit_codes::SUCCESS)
}
