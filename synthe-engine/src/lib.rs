// Engine backends for the synthesis front end

// Shared helpers
#[cfg(feature = "command")]
pub(crate) mod utils;

#[cfg(feature = "library")]
pub mod library;

#[cfg(feature = "library")]
pub use library::{ForeignWave, LibraryEngine};

#[cfg(feature = "command")]
pub mod command;

#[cfg(feature = "command")]
pub use command::CommandEngine;
