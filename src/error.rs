//! Error types for the `spatialmedia` crate.
//!
//! This module defines [`SpatialMediaError`], the unified error type returned
//! by all fallible operations in the crate. Errors carry enough context (file
//! paths, box names, channel counts) to explain the failure to a user without
//! additional logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

/// The unified error type for all `spatialmedia` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpatialMediaError {
    /// The input path does not reference an existing file.
    #[error("Input file not found: {}", path.display())]
    FileNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// A file could not be opened or created.
    #[error("Failed to open file at {}: {reason}", path.display())]
    FileOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// Source and destination resolve to the same file.
    #[error("Input and output cannot be the same file: {}", path.display())]
    SameInputOutput {
        /// The shared path.
        path: PathBuf,
    },

    /// The file extension is not one of the supported container types.
    #[error("Unsupported file type: {0:?} (expected .mp4 or .mov)")]
    UnsupportedFileType(String),

    /// The MP4/MOV box structure is malformed.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// The file has no track with a `vide` handler.
    #[error("No video track found in file")]
    NoVideoTrack,

    /// Spatial audio was requested but the file has no `soun` track.
    #[error("No audio track found in file")]
    NoAudioTrack,

    /// The audio track's channel count does not match the ambisonic order.
    #[error(
        "Expected {expected} audio channels for ambisonic order {order}, found {found}"
    )]
    AudioChannelMismatch {
        /// Ambisonic order requested.
        order: u32,
        /// Channel count required by that order.
        expected: u32,
        /// Channel count declared by the sample entry.
        found: u32,
    },

    /// A shifted `stco` chunk offset no longer fits in 32 bits.
    #[error("Chunk offset {offset} overflows a 32-bit stco entry after moving moov by {delta} bytes")]
    ChunkOffsetOverflow {
        /// Original chunk offset.
        offset: u64,
        /// Size change applied to `moov`.
        delta: i64,
    },

    /// The ambisonic order needs more channels than an `SA3D` box can list.
    #[error("Ambisonic order {order} is too large for an SA3D channel map")]
    InvalidAmbisonicOrder {
        /// Order that was requested.
        order: u32,
    },

    /// A stereo mode string was not recognised.
    #[error("Invalid stereo mode: {0:?} (expected top-bottom or left-right)")]
    InvalidStereoMode(String),

    /// A crop specification was malformed or geometrically impossible.
    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    /// Spherical XML embedded in the file could not be parsed.
    #[error("Invalid spherical XML: {0}")]
    InvalidSphericalXml(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<quick_xml::Error> for SpatialMediaError {
    fn from(error: quick_xml::Error) -> Self {
        SpatialMediaError::InvalidSphericalXml(error.to_string())
    }
}
