//! Writing metadata boxes into an MP4/MOV file.
//!
//! [`inject_metadata`] copies `src` to `dest`, adding a spherical `uuid` box
//! to every video track and, when requested, an `SA3D` box to the audio
//! track. The audio and video streams themselves are copied untouched.
//!
//! # Example
//!
//! ```no_run
//! use spatialmedia::{Metadata, generate_spherical_xml, inject_metadata};
//!
//! let mut metadata = Metadata::new();
//! metadata.video = Some(generate_spherical_xml(None, None));
//!
//! let mut log = Vec::new();
//! inject_metadata("in.mp4", "out.mp4", &metadata, |line| log.push(line))?;
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::SpatialMediaError;
use crate::examine::{ExaminationReport, TrackKind};
use crate::metadata::Metadata;
use crate::mp4::{Mp4Box, Mp4File, is_audio_sample_entry, sample_entry_channel_count};
use crate::progress::{NoOpProgress, ProgressCallback};
use crate::spatial_audio::{SA3D, SpatialAudioMetadata};
use crate::spherical::SPHERICAL_UUID;

/// File extensions accepted by [`inject_metadata`], compared case-insensitively.
pub const MPEG_FILE_EXTENSIONS: [&str; 2] = ["mp4", "mov"];

/// Inject `metadata` into `src`, writing the result to `dest`.
///
/// Every human-readable status line is passed to `console` in order.
/// `dest` is written through a temporary file in the same directory and only
/// appears once the whole file has been written.
///
/// # Errors
///
/// - [`SpatialMediaError::UnsupportedFileType`] for extensions other than
///   `.mp4`/`.mov`.
/// - [`SpatialMediaError::SameInputOutput`] if `src` and `dest` are the same.
/// - [`SpatialMediaError::InvalidContainer`] for malformed files.
/// - [`SpatialMediaError::NoVideoTrack`], [`SpatialMediaError::NoAudioTrack`]
///   or [`SpatialMediaError::AudioChannelMismatch`] when a track the metadata
///   targets is missing or incompatible.
pub fn inject_metadata<P, Q, F>(
    src: P,
    dest: Q,
    metadata: &Metadata,
    console: F,
) -> Result<(), SpatialMediaError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(String),
{
    inject_metadata_with_progress(src, dest, metadata, console, &NoOpProgress)
}

/// [`inject_metadata`] with a callback observing the output write.
pub fn inject_metadata_with_progress<P, Q, F>(
    src: P,
    dest: Q,
    metadata: &Metadata,
    mut console: F,
    progress: &dyn ProgressCallback,
) -> Result<(), SpatialMediaError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(String),
{
    let src = src.as_ref();
    let dest = dest.as_ref();

    check_extension(src)?;
    if is_same_file(src, dest) {
        return Err(SpatialMediaError::SameInputOutput {
            path: dest.to_path_buf(),
        });
    }

    log::debug!("Injecting metadata: {} -> {}", src.display(), dest.display());
    let file = File::open(src).map_err(|error| SpatialMediaError::FileOpen {
        path: src.to_path_buf(),
        reason: error.to_string(),
    })?;
    let permissions = file.metadata()?.permissions();
    let mut reader = BufReader::new(file);
    let mut mp4 = Mp4File::load(&mut reader)?;

    if let Some(xml) = &metadata.video {
        let tracks = add_spherical(&mut mp4.moov, xml)?;
        log::debug!("Added spherical metadata to {tracks} video track(s)");
    }
    if let Some(audio) = &metadata.audio {
        let entries = add_spatial_audio(&mut mp4.moov, audio)?;
        log::debug!("Added SA3D box to {entries} sample entries");
    }

    console("Saved file settings".to_string());
    for line in ExaminationReport::from_file(&mp4)?.lines() {
        console(line);
    }

    let directory = dest
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let open_error = |error: std::io::Error| SpatialMediaError::FileOpen {
        path: dest.to_path_buf(),
        reason: error.to_string(),
    };
    let mut temporary = tempfile::Builder::new()
        .prefix(".spatialmedia-")
        .tempfile_in(directory)
        .map_err(open_error)?;
    {
        let mut writer = BufWriter::new(temporary.as_file_mut());
        mp4.save(&mut reader, &mut writer, progress)?;
        writer.flush()?;
    }
    fs::set_permissions(temporary.path(), permissions)?;
    temporary
        .persist(dest)
        .map_err(|error| open_error(error.error))?;

    log::info!(
        "Wrote {} ({} bytes)",
        dest.display(),
        mp4.output_size()
    );
    Ok(())
}

fn check_extension(path: &Path) -> Result<(), SpatialMediaError> {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if MPEG_FILE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(SpatialMediaError::UnsupportedFileType(extension))
    }
}

fn is_same_file(src: &Path, dest: &Path) -> bool {
    match (src.canonicalize(), dest.canonicalize()) {
        (Ok(src), Ok(dest)) => src == dest,
        _ => src == dest,
    }
}

/// Replace spherical `uuid` boxes on every track and add one per video track.
///
/// Returns the number of video tracks tagged.
pub(crate) fn add_spherical(moov: &mut Mp4Box, xml: &str) -> Result<usize, SpatialMediaError> {
    let mut payload = SPHERICAL_UUID.to_vec();
    payload.extend_from_slice(xml.as_bytes());

    let mut tagged = 0usize;
    for trak in moov
        .children_mut()
        .into_iter()
        .flatten()
        .filter(|child| &child.name == b"trak")
    {
        let removed = trak.remove_children(|child| child.has_user_type(&SPHERICAL_UUID));
        if removed > 0 {
            log::debug!("Removed {removed} existing spherical box(es)");
        }
        if TrackKind::of(trak) != TrackKind::Video {
            continue;
        }
        if let Some(children) = trak.children_mut() {
            children.push(Mp4Box::data(*b"uuid", payload.clone()));
            tagged += 1;
        }
    }

    if tagged == 0 {
        return Err(SpatialMediaError::NoVideoTrack);
    }
    Ok(tagged)
}

/// Put an `SA3D` box into each sound sample entry of the first audio track.
///
/// Returns the number of sample entries updated.
pub(crate) fn add_spatial_audio(
    moov: &mut Mp4Box,
    audio: &SpatialAudioMetadata,
) -> Result<usize, SpatialMediaError> {
    let trak = moov
        .children_mut()
        .into_iter()
        .flatten()
        .find(|child| &child.name == b"trak" && TrackKind::of(child) == TrackKind::Audio)
        .ok_or(SpatialMediaError::NoAudioTrack)?;
    let stsd = trak
        .find_mut(&[b"mdia", b"minf", b"stbl", b"stsd"])
        .ok_or_else(|| {
            SpatialMediaError::InvalidContainer("audio track has no stsd box".to_string())
        })?;

    let expected = audio.num_channels();
    let mut updated = 0usize;
    for entry in stsd.children_mut().into_iter().flatten() {
        if !is_audio_sample_entry(&entry.name) || !entry.is_container() {
            continue;
        }
        let found = sample_entry_channel_count(entry).unwrap_or_default();
        if found != expected {
            return Err(SpatialMediaError::AudioChannelMismatch {
                order: audio.ambisonic_order,
                expected,
                found,
            });
        }
        entry.remove_children(|child| child.name == SA3D);
        if let Some(children) = entry.children_mut() {
            children.push(audio.to_box());
            updated += 1;
        }
    }

    if updated == 0 {
        return Err(SpatialMediaError::InvalidContainer(
            "audio track has no supported sound sample entry".to_string(),
        ));
    }
    Ok(updated)
}
