pub mod common;
pub mod completions;
pub mod conflicts;
pub mod contacts;
pub mod source;
pub mod status;
pub mod sync;
