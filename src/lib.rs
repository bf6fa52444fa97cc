//! # spatialmedia
//!
//! Inject 360-degree spherical video and spatial audio metadata into MP4/MOV
//! files without re-encoding them.
//!
//! Spherical video is tagged with an RDF/XML document in a `uuid` box on each
//! video track; spatial (ambisonic) audio is tagged with an `SA3D` box in the
//! audio track's sample entry. Only the `moov` box is rewritten; media data
//! is streamed from the source and chunk offsets are fixed up as needed.
//!
//! ## Quick Start
//!
//! ### Inject from command-line style options
//!
//! ```no_run
//! use spatialmedia::{InjectionOptions, StereoMode, inject_360_metadata};
//!
//! let options = InjectionOptions::new().with_stereo_mode(Some(StereoMode::TopBottom));
//! for line in inject_360_metadata("input.mp4", "output.mp4", &options)? {
//!     println!("{line}");
//! }
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```
//!
//! ### Build the metadata yourself
//!
//! ```no_run
//! use spatialmedia::{Metadata, generate_spherical_xml, get_spatial_audio_metadata, inject_metadata};
//!
//! let mut metadata = Metadata::new();
//! metadata.video = Some(generate_spherical_xml(None, None));
//! metadata.audio = Some(get_spatial_audio_metadata(1, false)?);
//! inject_metadata("input.mov", "output.mov", &metadata, |line| println!("{line}"))?;
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```
//!
//! ### Read metadata back
//!
//! ```no_run
//! let report = spatialmedia::examine_metadata("output.mp4")?;
//! print!("{report}");
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```

pub mod configuration;
pub mod error;
pub mod examine;
pub mod inject;
pub mod inject_360;
pub mod metadata;
pub mod mp4;
pub mod progress;
pub mod spatial_audio;
pub mod spherical;

pub use configuration::{DEFAULT_AUDIO_DESCRIPTION, InjectionOptions};
pub use error::SpatialMediaError;
pub use examine::{ExaminationReport, TrackKind, TrackReport, examine_metadata};
pub use inject::{MPEG_FILE_EXTENSIONS, inject_metadata, inject_metadata_with_progress};
pub use inject_360::inject_360_metadata;
pub use metadata::Metadata;
pub use progress::{ProgressCallback, ProgressInfo};
pub use spatial_audio::{
    AmbisonicType, AudioMetadataDescription, ChannelOrdering, Normalization, SpatialAudioMetadata,
    get_spatial_audio_metadata,
};
pub use spherical::{
    Crop, SPHERICAL_UUID, SphericalVideoInfo, StereoMode, generate_spherical_xml,
    parse_spherical_xml,
};
