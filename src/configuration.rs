//! Injection configuration.
//!
//! [`InjectionOptions`] is a builder carrying the command-line choices
//! (stereo mode, spherical-only, spatial audio, crop) plus an optional
//! progress callback through to [`inject_360_metadata`](crate::inject_360_metadata).
//!
//! # Example
//!
//! ```
//! use spatialmedia::{InjectionOptions, StereoMode};
//!
//! let options = InjectionOptions::new()
//!     .with_stereo_mode(Some(StereoMode::TopBottom))
//!     .with_spatial_audio(true);
//! let metadata = options.build_metadata()?;
//! assert!(metadata.video.unwrap().contains("top-bottom"));
//! assert_eq!(metadata.audio.unwrap().ambisonic_order, 1);
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::SpatialMediaError;
use crate::metadata::Metadata;
use crate::progress::{NoOpProgress, ProgressCallback};
use crate::spatial_audio::{AudioMetadataDescription, get_spatial_audio_metadata};
use crate::spherical::{Crop, StereoMode, generate_spherical_xml};

/// Ambisonic description used whenever spatial audio is enabled.
///
/// First order, no head-locked stereo: a four-channel sound field.
pub const DEFAULT_AUDIO_DESCRIPTION: AudioMetadataDescription = AudioMetadataDescription {
    order: 1,
    has_head_locked_stereo: false,
};

/// Options controlling which metadata is injected.
#[derive(Clone)]
pub struct InjectionOptions {
    pub(crate) stereo_mode: Option<StereoMode>,
    pub(crate) spherical_only: bool,
    pub(crate) spatial_audio: bool,
    pub(crate) crop: Option<Crop>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for InjectionOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InjectionOptions")
            .field("stereo_mode", &self.stereo_mode)
            .field("spherical_only", &self.spherical_only)
            .field("spatial_audio", &self.spatial_audio)
            .field("crop", &self.crop)
            .finish_non_exhaustive()
    }
}

impl Default for InjectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectionOptions {
    /// Monoscopic spherical video, no spatial audio, no crop.
    pub fn new() -> Self {
        Self {
            stereo_mode: None,
            spherical_only: false,
            spatial_audio: false,
            crop: None,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the stereo layout. `None` means monoscopic.
    #[must_use]
    pub fn with_stereo_mode(mut self, mode: Option<StereoMode>) -> Self {
        self.stereo_mode = mode;
        self
    }

    /// Force spherical-only metadata. Overrides any stereo mode.
    #[must_use]
    pub fn with_spherical_only(mut self, spherical_only: bool) -> Self {
        self.spherical_only = spherical_only;
        self
    }

    /// Inject the [`DEFAULT_AUDIO_DESCRIPTION`] spatial audio box.
    #[must_use]
    pub fn with_spatial_audio(mut self, spatial_audio: bool) -> Self {
        self.spatial_audio = spatial_audio;
        self
    }

    /// Describe the video as a crop of a larger panorama.
    #[must_use]
    pub fn with_crop(mut self, crop: Option<Crop>) -> Self {
        self.crop = crop;
        self
    }

    /// Attach a progress callback for the output write.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stereo mode that will actually be written, after spherical-only is
    /// applied.
    pub fn effective_stereo_mode(&self) -> Option<StereoMode> {
        if self.spherical_only {
            None
        } else {
            self.stereo_mode
        }
    }

    /// Build the metadata container these options describe.
    ///
    /// # Errors
    ///
    /// Propagates [`SpatialMediaError::InvalidAmbisonicOrder`] from the
    /// spatial audio generator.
    pub fn build_metadata(&self) -> Result<Metadata, SpatialMediaError> {
        let mut metadata = Metadata::new();
        metadata.video = Some(generate_spherical_xml(
            self.effective_stereo_mode(),
            self.crop.as_ref(),
        ));

        if self.spatial_audio {
            let description = DEFAULT_AUDIO_DESCRIPTION;
            metadata.audio = Some(get_spatial_audio_metadata(
                description.order,
                description.has_head_locked_stereo,
            )?);
        }

        Ok(metadata)
    }
}
