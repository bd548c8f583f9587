//! Numbered docker container listings with batch operations by listing
//! number. See README.md for more.

mod batch;
mod command;
mod indices;
mod listing;
mod snapshot;

pub use batch::*;
pub use command::*;
pub use indices::*;
pub use listing::*;
pub use snapshot::*;
