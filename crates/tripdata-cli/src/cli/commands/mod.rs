//! CLI command handlers. Each command is in its own file.

mod collect;
mod convert;
mod poll;

pub use collect::{run_collect, CollectArgs};
pub use convert::{run_convert, ConvertArgs};
