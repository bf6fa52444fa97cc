//! The metadata container handed to [`inject_metadata`](crate::inject_metadata).

use crate::spatial_audio::SpatialAudioMetadata;

/// Metadata to write into a file.
///
/// Both fields are optional; a field left as `None` is not injected. A fresh
/// container is built per injection.
///
/// # Example
///
/// ```
/// use spatialmedia::{Metadata, StereoMode, generate_spherical_xml};
///
/// let mut metadata = Metadata::new();
/// metadata.video = Some(generate_spherical_xml(Some(StereoMode::TopBottom), None));
/// assert!(metadata.audio.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct Metadata {
    /// Spherical XML for the video track(s).
    pub video: Option<String>,
    /// Spatial audio description for the audio track.
    pub audio: Option<SpatialAudioMetadata>,
}

impl Metadata {
    /// An empty container: nothing will be injected.
    pub fn new() -> Self {
        Self::default()
    }
}
