//! Reading spherical and spatial audio metadata back out of a file.
//!
//! # Example
//!
//! ```no_run
//! use spatialmedia::examine_metadata;
//!
//! let report = examine_metadata("video.mp4")?;
//! if report.has_spherical() {
//!     print!("{report}");
//! }
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::SpatialMediaError;
use crate::mp4::{FourCc, Mp4Box, Mp4File, fourcc_str, is_audio_sample_entry};
use crate::spatial_audio::{SA3D, SpatialAudioMetadata};
use crate::spherical::{SPHERICAL_UUID, SphericalVideoInfo, parse_spherical_xml};

/// What a track carries, from its `hdlr` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Other(FourCc),
    /// No readable handler.
    Unknown,
}

impl TrackKind {
    pub(crate) fn of(trak: &Mp4Box) -> Self {
        match trak.handler_type() {
            Some(handler) if &handler == b"vide" => TrackKind::Video,
            Some(handler) if &handler == b"soun" => TrackKind::Audio,
            Some(handler) => TrackKind::Other(handler),
            None => TrackKind::Unknown,
        }
    }
}

impl Display for TrackKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TrackKind::Video => f.write_str("video"),
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Other(handler) => f.write_str(&fourcc_str(handler)),
            TrackKind::Unknown => f.write_str("unknown"),
        }
    }
}

/// Metadata found on one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReport {
    /// Ordinal among the file's tracks, counting from 0.
    pub index: usize,
    pub kind: TrackKind,
    pub spherical: Option<SphericalVideoInfo>,
    pub spatial_audio: Option<SpatialAudioMetadata>,
}

impl TrackReport {
    fn has_metadata(&self) -> bool {
        self.spherical.is_some() || self.spatial_audio.is_some()
    }
}

/// Per-track summary of the metadata present in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExaminationReport {
    pub tracks: Vec<TrackReport>,
}

/// Parsed sound sample entries of a track.
pub(crate) fn sample_entries(trak: &Mp4Box) -> impl Iterator<Item = &Mp4Box> {
    trak.find(&[b"mdia", b"minf", b"stbl", b"stsd"])
        .map(Mp4Box::children)
        .unwrap_or_default()
        .iter()
        .filter(|entry| is_audio_sample_entry(&entry.name) && entry.is_container())
}

impl ExaminationReport {
    /// Inspect every track of a loaded file.
    ///
    /// # Errors
    ///
    /// Returns an error if an embedded spherical XML document or `SA3D` box
    /// is malformed.
    pub fn from_file(file: &Mp4File) -> Result<Self, SpatialMediaError> {
        let mut tracks = Vec::new();
        for (index, trak) in file.tracks().enumerate() {
            let spherical = trak
                .children()
                .iter()
                .find(|child| child.has_user_type(&SPHERICAL_UUID))
                .and_then(Mp4Box::payload)
                .map(|payload| parse_spherical_xml(&payload[SPHERICAL_UUID.len()..]))
                .transpose()?;

            let spatial_audio = sample_entries(trak)
                .find_map(|entry| entry.child(&SA3D))
                .and_then(Mp4Box::payload)
                .map(SpatialAudioMetadata::decode)
                .transpose()?;

            tracks.push(TrackReport {
                index,
                kind: TrackKind::of(trak),
                spherical,
                spatial_audio,
            });
        }
        Ok(Self { tracks })
    }

    pub fn has_spherical(&self) -> bool {
        self.tracks.iter().any(|track| track.spherical.is_some())
    }

    pub fn has_spatial_audio(&self) -> bool {
        self.tracks.iter().any(|track| track.spatial_audio.is_some())
    }

    /// Console lines describing every track that carries metadata.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for track in self.tracks.iter().filter(|track| track.has_metadata()) {
            lines.push(format!("\tTrack {} ({})", track.index, track.kind));
            if let Some(spherical) = &track.spherical {
                for (key, value) in &spherical.entries {
                    lines.push(format!("\t\t{key} = {value}"));
                }
            }
            if let Some(audio) = &track.spatial_audio {
                lines.extend(audio.describe().into_iter().map(|line| format!("\t\t{line}")));
            }
        }
        lines
    }
}

impl Display for ExaminationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let lines = self.lines();
        if lines.is_empty() {
            writeln!(f, "No spherical or spatial audio metadata found.")?;
        }
        for line in lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Open `path` and report the spherical and spatial audio metadata it holds.
///
/// # Errors
///
/// Returns [`SpatialMediaError::FileNotFound`] if `path` is not a file,
/// [`SpatialMediaError::FileOpen`] if it cannot be opened, or
/// [`SpatialMediaError::InvalidContainer`] if it is not a well-formed MP4/MOV.
pub fn examine_metadata<P: AsRef<Path>>(path: P) -> Result<ExaminationReport, SpatialMediaError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SpatialMediaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    log::debug!("Examining {}", path.display());
    let file = File::open(path).map_err(|error| SpatialMediaError::FileOpen {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    let mp4 = Mp4File::load(&mut BufReader::new(file))?;
    ExaminationReport::from_file(&mp4)
}
