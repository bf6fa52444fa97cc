//! Minimal ISO base media / QuickTime box handling.
//!
//! Just enough structure to add and remove metadata boxes inside `moov`
//! and write the file back out with consistent sizes and chunk offsets.

pub mod file;
pub mod header;
pub mod tree;

pub use file::Mp4File;
pub use header::{BoxHeader, FourCc, fourcc_str};
pub use tree::{BoxContent, Mp4Box, is_audio_sample_entry, sample_entry_channel_count};
