pub(crate) mod clipboard;
pub(crate) mod complete;
pub(crate) mod doctor;
pub(crate) mod highlight;
pub(crate) mod navigate;

use anyhow::Result;
use std::io::Read;

/// `arg` when given, otherwise all of stdin.
pub(crate) fn text_or_stdin(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
