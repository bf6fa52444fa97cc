//! Spatial audio (ambisonics) metadata and the `SA3D` box.
//!
//! The `SA3D` box lives inside the sound sample entry of the audio track and
//! tells players how to interpret the channels as an ambisonic sound field.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::SpatialMediaError;
use crate::mp4::Mp4Box;

/// Box type of the spatial audio box.
pub const SA3D: [u8; 4] = *b"SA3D";

/// The two knobs a caller chooses when describing spatial audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMetadataDescription {
    /// Ambisonic order.
    pub order: u32,
    /// Two extra head-locked stereo channels follow the ambisonic ones.
    pub has_head_locked_stereo: bool,
}

impl AudioMetadataDescription {
    /// Describe a sound field of `order`.
    pub fn new(order: u32, has_head_locked_stereo: bool) -> Self {
        Self {
            order,
            has_head_locked_stereo,
        }
    }

    /// Channels required: `(order + 1)^2` ambisonic plus two head-locked.
    ///
    /// `None` when the count does not fit the 32-bit channel count of `SA3D`.
    pub fn num_channels(&self) -> Option<u32> {
        let side = self.order.checked_add(1)?;
        let ambisonic = side.checked_mul(side)?;
        if self.has_head_locked_stereo {
            ambisonic.checked_add(2)
        } else {
            Some(ambisonic)
        }
    }
}

/// Ambisonic type field of `SA3D`. Only periphonic (full sphere) is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbisonicType {
    Periphonic,
    Other(u8),
}

/// Channel ordering field of `SA3D`. Only ACN is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrdering {
    Acn,
    Other(u8),
}

/// Normalization field of `SA3D`. Only SN3D is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Sn3d,
    Other(u8),
}

impl Display for AmbisonicType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AmbisonicType::Periphonic => f.write_str("periphonic"),
            AmbisonicType::Other(value) => write!(f, "unknown ({value})"),
        }
    }
}

impl Display for ChannelOrdering {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ChannelOrdering::Acn => f.write_str("ACN"),
            ChannelOrdering::Other(value) => write!(f, "unknown ({value})"),
        }
    }
}

impl Display for Normalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Normalization::Sn3d => f.write_str("SN3D"),
            Normalization::Other(value) => write!(f, "unknown ({value})"),
        }
    }
}

/// Contents of an `SA3D` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialAudioMetadata {
    /// Box version, always 0 when written.
    pub version: u8,
    pub ambisonic_type: AmbisonicType,
    pub ambisonic_order: u32,
    pub channel_ordering: ChannelOrdering,
    pub normalization: Normalization,
    /// Source track channel for each ambisonic component.
    pub channel_map: Vec<u32>,
    /// Stored in the top bit of the ambisonic type byte.
    pub has_head_locked_stereo: bool,
}

/// Describe a periphonic, ACN-ordered, SN3D-normalised sound field of the
/// given order with an identity channel map.
///
/// # Errors
///
/// Returns [`SpatialMediaError::InvalidAmbisonicOrder`] if the channel count
/// for `order` does not fit in 32 bits.
pub fn get_spatial_audio_metadata(
    order: u32,
    has_head_locked_stereo: bool,
) -> Result<SpatialAudioMetadata, SpatialMediaError> {
    let channels = AudioMetadataDescription::new(order, has_head_locked_stereo)
        .num_channels()
        .ok_or(SpatialMediaError::InvalidAmbisonicOrder { order })?;
    Ok(SpatialAudioMetadata {
        version: 0,
        ambisonic_type: AmbisonicType::Periphonic,
        ambisonic_order: order,
        channel_ordering: ChannelOrdering::Acn,
        normalization: Normalization::Sn3d,
        channel_map: (0..channels).collect(),
        has_head_locked_stereo,
    })
}

impl SpatialAudioMetadata {
    /// Number of entries in the channel map.
    pub fn num_channels(&self) -> u32 {
        self.channel_map.len() as u32
    }

    /// Serialize the `SA3D` payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(12 + 4 * self.channel_map.len());
        payload.push(self.version);
        let ambisonic_type = match self.ambisonic_type {
            AmbisonicType::Periphonic => 0,
            AmbisonicType::Other(value) => value & 0x7f,
        };
        payload.push((u8::from(self.has_head_locked_stereo) << 7) | ambisonic_type);
        payload.extend_from_slice(&self.ambisonic_order.to_be_bytes());
        payload.push(match self.channel_ordering {
            ChannelOrdering::Acn => 0,
            ChannelOrdering::Other(value) => value,
        });
        payload.push(match self.normalization {
            Normalization::Sn3d => 0,
            Normalization::Other(value) => value,
        });
        payload.extend_from_slice(&self.num_channels().to_be_bytes());
        for channel in &self.channel_map {
            payload.extend_from_slice(&channel.to_be_bytes());
        }
        payload
    }

    pub fn to_box(&self) -> Mp4Box {
        Mp4Box::data(SA3D, self.encode())
    }

    /// Parse an `SA3D` payload.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialMediaError::InvalidContainer`] if the payload is
    /// shorter than its declared channel map.
    pub fn decode(payload: &[u8]) -> Result<Self, SpatialMediaError> {
        let too_short = || {
            SpatialMediaError::InvalidContainer(format!(
                "SA3D box payload of {} bytes is truncated",
                payload.len()
            ))
        };
        if payload.len() < 12 {
            return Err(too_short());
        }

        let type_byte = payload[1];
        let num_channels = u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]) as usize;
        let map_bytes = payload
            .get(12..12 + num_channels.checked_mul(4).ok_or_else(too_short)?)
            .ok_or_else(too_short)?;

        Ok(Self {
            version: payload[0],
            ambisonic_type: match type_byte & 0x7f {
                0 => AmbisonicType::Periphonic,
                other => AmbisonicType::Other(other),
            },
            ambisonic_order: u32::from_be_bytes([payload[2], payload[3], payload[4], payload[5]]),
            channel_ordering: match payload[6] {
                0 => ChannelOrdering::Acn,
                other => ChannelOrdering::Other(other),
            },
            normalization: match payload[7] {
                0 => Normalization::Sn3d,
                other => Normalization::Other(other),
            },
            channel_map: map_bytes
                .chunks_exact(4)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            has_head_locked_stereo: type_byte & 0x80 != 0,
        })
    }

    /// Human-readable description, one field per line.
    pub fn describe(&self) -> Vec<String> {
        let map = self
            .channel_map
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            format!("Ambisonic Type: {}", self.ambisonic_type),
            format!(
                "Contains Head-Locked Stereo: {}",
                if self.has_head_locked_stereo { "True" } else { "False" }
            ),
            format!("Ambisonic Order: {}", self.ambisonic_order),
            format!("Channel Ordering: {}", self.channel_ordering),
            format!("Normalization: {}", self.normalization),
            format!("Number of Channels: {}", self.num_channels()),
            format!("Channel Map: [{map}]"),
        ]
    }
}
