//! Pure, I/O-free hashline mechanics: tagging, fuzzy location, diffing,
//! autocorrect heuristics, the batch edit engine, and the streaming
//! formatter. Nothing in this module touches the filesystem.

pub mod autocorrect;
pub mod diff;
pub mod fuzzy;
pub mod hashline;
pub mod stream;
pub mod tag;
