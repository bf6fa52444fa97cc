//! The command-line entry point's injection routine.
//!
//! [`inject_360_metadata`] checks that the input exists, turns
//! [`InjectionOptions`] into a [`Metadata`](crate::Metadata) container and
//! hands it to [`inject_metadata`](crate::inject_metadata), collecting the
//! console lines it produces.
//!
//! # Example
//!
//! ```no_run
//! use spatialmedia::{InjectionOptions, StereoMode, inject_360_metadata};
//!
//! let options = InjectionOptions::new()
//!     .with_stereo_mode(Some(StereoMode::TopBottom))
//!     .with_spatial_audio(true);
//! for line in inject_360_metadata("in.mp4", "out.mp4", &options)? {
//!     println!("{line}");
//! }
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```

use std::path::Path;

use crate::configuration::InjectionOptions;
use crate::error::SpatialMediaError;
use crate::inject::inject_metadata_with_progress;

/// Inject 360 video (and optionally spatial audio) metadata.
///
/// Returns the console lines logged during injection, in order.
///
/// # Errors
///
/// Returns [`SpatialMediaError::FileNotFound`] before doing any other work if
/// `input` is not an existing file; otherwise any error from
/// [`inject_metadata`](crate::inject_metadata).
pub fn inject_360_metadata<P, Q>(
    input: P,
    output: Q,
    options: &InjectionOptions,
) -> Result<Vec<String>, SpatialMediaError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input = input.as_ref();
    if !input.is_file() {
        return Err(SpatialMediaError::FileNotFound {
            path: input.to_path_buf(),
        });
    }

    let metadata = options.build_metadata()?;
    log::debug!("Injection options: {options:?}");

    let mut console_log = Vec::new();
    inject_metadata_with_progress(
        input,
        output,
        &metadata,
        |line| console_log.push(line),
        options.progress.as_ref(),
    )?;
    Ok(console_log)
}
