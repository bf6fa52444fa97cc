//! Spherical video (V1) metadata.
//!
//! Spherical video is described by a small RDF/XML document in the
//! `http://ns.google.com/videos/1.0/spherical/` namespace, stored in a `uuid`
//! box (user type [`SPHERICAL_UUID`]) inside each video `trak`.
//!
//! # Example
//!
//! ```
//! use spatialmedia::{StereoMode, generate_spherical_xml, parse_spherical_xml};
//!
//! let xml = generate_spherical_xml(Some(StereoMode::TopBottom), None);
//! let info = parse_spherical_xml(xml.as_bytes()).unwrap();
//! assert_eq!(info.stereo_mode(), Some(StereoMode::TopBottom));
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::SpatialMediaError;

/// User type of the `uuid` box carrying spherical XML
/// (`ffcc8263-f855-4a93-8814-587a02521fdd`).
pub const SPHERICAL_UUID: [u8; 16] = [
    0xff, 0xcc, 0x82, 0x63, 0xf8, 0x55, 0x4a, 0x93, 0x88, 0x14, 0x58, 0x7a, 0x02, 0x52, 0x1f, 0xdd,
];

const SPHERICAL_XML_HEADER: &str = "<?xml version=\"1.0\"?><rdf:SphericalVideo\n\
xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\"\n\
xmlns:GSpherical=\"http://ns.google.com/videos/1.0/spherical/\">";

const SPHERICAL_XML_CONTENTS: &str = "<GSpherical:Spherical>true</GSpherical:Spherical>\
<GSpherical:Stitched>true</GSpherical:Stitched>\
<GSpherical:StitchingSoftware>Spherical Metadata Tool</GSpherical:StitchingSoftware>\
<GSpherical:ProjectionType>equirectangular</GSpherical:ProjectionType>";

const SPHERICAL_XML_FOOTER: &str = "</rdf:SphericalVideo>";

/// Layout used to pack both eyes' views into one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoMode {
    /// Left eye on top, right eye below.
    TopBottom,
    /// Left eye on the left, right eye on the right.
    LeftRight,
}

impl StereoMode {
    /// The value written to `GSpherical:StereoMode`.
    pub fn as_str(self) -> &'static str {
        match self {
            StereoMode::TopBottom => "top-bottom",
            StereoMode::LeftRight => "left-right",
        }
    }
}

impl Display for StereoMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for StereoMode {
    type Err = SpatialMediaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top-bottom" => Ok(StereoMode::TopBottom),
            "left-right" => Ok(StereoMode::LeftRight),
            _ => Err(SpatialMediaError::InvalidStereoMode(value.to_string())),
        }
    }
}

/// Cropped-area geometry for a partial panorama.
///
/// Parsed from `cropped_width:cropped_height:full_width:full_height:left:top`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub cropped_width: u32,
    pub cropped_height: u32,
    pub full_width: u32,
    pub full_height: u32,
    pub left: u32,
    pub top: u32,
}

impl Crop {
    /// Build a crop, checking that it lies inside the full panorama.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialMediaError::InvalidCrop`] for zero dimensions or a
    /// cropped area extending past the panorama.
    pub fn new(
        cropped_width: u32,
        cropped_height: u32,
        full_width: u32,
        full_height: u32,
        left: u32,
        top: u32,
    ) -> Result<Self, SpatialMediaError> {
        if cropped_width == 0 || cropped_height == 0 || full_width == 0 || full_height == 0 {
            return Err(SpatialMediaError::InvalidCrop(
                "cropped and full dimensions must be greater than zero".to_string(),
            ));
        }
        if u64::from(left) + u64::from(cropped_width) > u64::from(full_width)
            || u64::from(top) + u64::from(cropped_height) > u64::from(full_height)
        {
            return Err(SpatialMediaError::InvalidCrop(format!(
                "cropped area {cropped_width}x{cropped_height} at ({left}, {top}) exceeds the {full_width}x{full_height} panorama"
            )));
        }
        Ok(Self {
            cropped_width,
            cropped_height,
            full_width,
            full_height,
            left,
            top,
        })
    }
}

impl FromStr for Crop {
    type Err = SpatialMediaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let fields = value
            .split(':')
            .map(|field| field.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| SpatialMediaError::InvalidCrop(format!("{value:?}: {error}")))?;
        match fields.as_slice() {
            &[cropped_width, cropped_height, full_width, full_height, left, top] => Crop::new(
                cropped_width,
                cropped_height,
                full_width,
                full_height,
                left,
                top,
            ),
            _ => Err(SpatialMediaError::InvalidCrop(format!(
                "{value:?}: expected six colon-separated integers"
            ))),
        }
    }
}

/// Build the spherical XML document.
///
/// `stereo == None` describes a monoscopic equirectangular video.
pub fn generate_spherical_xml(stereo: Option<StereoMode>, crop: Option<&Crop>) -> String {
    let mut xml = String::from(SPHERICAL_XML_HEADER);
    xml.push_str(SPHERICAL_XML_CONTENTS);
    if let Some(mode) = stereo {
        xml.push_str(&format!("<GSpherical:StereoMode>{mode}</GSpherical:StereoMode>"));
    }
    if let Some(crop) = crop {
        for (key, value) in [
            ("CroppedAreaImageWidthPixels", crop.cropped_width),
            ("CroppedAreaImageHeightPixels", crop.cropped_height),
            ("FullPanoWidthPixels", crop.full_width),
            ("FullPanoHeightPixels", crop.full_height),
            ("CroppedAreaLeftPixels", crop.left),
            ("CroppedAreaTopPixels", crop.top),
        ] {
            xml.push_str(&format!("<GSpherical:{key}>{value}</GSpherical:{key}>"));
        }
    }
    xml.push_str(SPHERICAL_XML_FOOTER);
    xml
}

/// Key/value pairs read back from a spherical XML document, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SphericalVideoInfo {
    /// `GSpherical` element names and their text, in document order.
    pub entries: Vec<(String, String)>,
}

impl SphericalVideoInfo {
    /// Text of the first element named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `Spherical` is set to `true`.
    pub fn is_spherical(&self) -> bool {
        self.get("Spherical")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// Value of `ProjectionType`, usually `equirectangular`.
    pub fn projection_type(&self) -> Option<&str> {
        self.get("ProjectionType")
    }

    /// Stereo layout, or `None` for monoscopic or unrecognised values.
    pub fn stereo_mode(&self) -> Option<StereoMode> {
        self.get("StereoMode")?.parse().ok()
    }
}

/// Parse a spherical XML document into its element values.
///
/// # Errors
///
/// Returns [`SpatialMediaError::InvalidSphericalXml`] if the document is not
/// well-formed XML.
pub fn parse_spherical_xml(data: &[u8]) -> Result<SphericalVideoInfo, SpatialMediaError> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut info = SphericalVideoInfo::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                current = Some(String::from_utf8_lossy(element.local_name().as_ref()).into_owned());
            }
            Event::Text(text) => {
                if let Some(key) = current.take() {
                    info.entries.push((key, text.unescape()?.into_owned()));
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monoscopic_xml_has_no_stereo_mode() {
        let xml = generate_spherical_xml(None, None);
        assert!(xml.starts_with("<?xml version=\"1.0\"?><rdf:SphericalVideo"));
        assert!(xml.ends_with("</rdf:SphericalVideo>"));
        assert!(!xml.contains("StereoMode"));

        let info = parse_spherical_xml(xml.as_bytes()).unwrap();
        assert!(info.is_spherical());
        assert_eq!(info.get("Stitched"), Some("true"));
        assert_eq!(info.get("StitchingSoftware"), Some("Spherical Metadata Tool"));
        assert_eq!(info.projection_type(), Some("equirectangular"));
        assert_eq!(info.stereo_mode(), None);
    }

    #[test]
    fn stereo_modes_are_written() {
        let xml = generate_spherical_xml(Some(StereoMode::LeftRight), None);
        assert!(xml.contains("<GSpherical:StereoMode>left-right</GSpherical:StereoMode>"));
        let info = parse_spherical_xml(xml.as_bytes()).unwrap();
        assert_eq!(info.stereo_mode(), Some(StereoMode::LeftRight));
    }

    #[test]
    fn crop_elements_follow_stereo_mode() {
        let crop: Crop = "1920:960:3840:1920:960:480".parse().unwrap();
        let xml = generate_spherical_xml(Some(StereoMode::TopBottom), Some(&crop));
        let info = parse_spherical_xml(xml.as_bytes()).unwrap();
        let keys: Vec<&str> = info.entries.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(
            &keys[4..],
            [
                "StereoMode",
                "CroppedAreaImageWidthPixels",
                "CroppedAreaImageHeightPixels",
                "FullPanoWidthPixels",
                "FullPanoHeightPixels",
                "CroppedAreaLeftPixels",
                "CroppedAreaTopPixels",
            ]
        );
        assert_eq!(info.get("CroppedAreaLeftPixels"), Some("960"));
    }

    #[test]
    fn stereo_mode_parsing() {
        assert_eq!("top-bottom".parse::<StereoMode>().unwrap(), StereoMode::TopBottom);
        assert_eq!("LEFT-RIGHT".parse::<StereoMode>().unwrap(), StereoMode::LeftRight);
        assert!("mono".parse::<StereoMode>().is_err());
        assert_eq!(StereoMode::TopBottom.to_string(), "top-bottom");
    }

    #[test]
    fn crop_rejects_bad_geometry() {
        assert!("1:2:3".parse::<Crop>().is_err());
        assert!("a:1:1:1:0:0".parse::<Crop>().is_err());
        assert!("0:960:3840:1920:0:0".parse::<Crop>().is_err());
        assert!("1920:960:3840:1920:2000:0".parse::<Crop>().is_err());
        assert!("3840:1920:3840:1920:0:0".parse::<Crop>().is_ok());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let error = parse_spherical_xml(b"<a><b>text</a>").unwrap_err();
        assert!(matches!(error, SpatialMediaError::InvalidSphericalXml(_)));
    }
}
