//! In-memory box tree for the `moov` hierarchy.
//!
//! Only the boxes that injection has to descend into are parsed as
//! containers; every other box is kept as an opaque payload and written back
//! byte-for-byte.

use std::io::{self, Cursor, Write};

use crate::error::SpatialMediaError;

use super::header::{FourCc, fourcc_str, header_len, read_box_header, read_u16_at, read_u32_at, write_box_header};

/// Maximum nesting depth accepted while parsing.
const MAX_DEPTH: usize = 16;

/// Plain containers with no fields before their children.
const PLAIN_CONTAINERS: [&FourCc; 7] = [b"moov", b"trak", b"mdia", b"minf", b"stbl", b"edts", b"dinf"];

/// Sound sample entry types that may carry an `SA3D` box.
pub const AUDIO_SAMPLE_ENTRIES: [&FourCc; 13] = [
    b"mp4a", b"lpcm", b"sowt", b"twos", b"raw ", b"NONE", b"in24", b"in32", b"fl32", b"fl64",
    b"alaw", b"ulaw", b"Opus",
];

/// A single box: either an opaque payload or a container of child boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mp4Box {
    pub name: FourCc,
    pub content: BoxContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxContent {
    /// Payload kept verbatim.
    Data(Vec<u8>),
    /// Fixed fields (`prefix`), child boxes, then fewer than eight stray
    /// bytes (`trailer`) that some QuickTime writers leave at the end.
    Container {
        prefix: Vec<u8>,
        children: Vec<Mp4Box>,
        trailer: Vec<u8>,
    },
}

/// Length of the fixed sound description fields preceding child boxes.
fn sound_description_prefix(payload: &[u8]) -> Option<usize> {
    let prefix = match read_u16_at(payload, 8)? {
        0 => 28,
        1 => 44,
        2 => 64,
        _ => return None,
    };
    (payload.len() >= prefix).then_some(prefix)
}

pub fn is_audio_sample_entry(name: &FourCc) -> bool {
    AUDIO_SAMPLE_ENTRIES.contains(&name)
}

fn parse_children(data: &[u8], depth: usize) -> Result<(Vec<Mp4Box>, Vec<u8>), SpatialMediaError> {
    let mut children = Vec::new();
    let mut pos = 0usize;
    while data.len() - pos >= 8 {
        let remaining = (data.len() - pos) as u64;
        let header = read_box_header(&mut Cursor::new(&data[pos..])).map_err(|_| {
            SpatialMediaError::InvalidContainer(format!("truncated box header at offset {pos}"))
        })?;
        let size = if header.size == 0 { remaining } else { header.size };
        if size < header.header_size || size > remaining {
            return Err(SpatialMediaError::InvalidContainer(format!(
                "box '{}' has size {size} but only {remaining} bytes remain in its parent",
                fourcc_str(&header.name)
            )));
        }
        let start = pos + header.header_size as usize;
        let end = pos + size as usize;
        children.push(Mp4Box::parse(header.name, &data[start..end], depth + 1)?);
        pos = end;
    }
    Ok((children, data[pos..].to_vec()))
}

impl Mp4Box {
    /// A box holding an opaque payload.
    pub fn data(name: FourCc, payload: Vec<u8>) -> Self {
        Self {
            name,
            content: BoxContent::Data(payload),
        }
    }

    /// A container with no prefix fields.
    pub fn container(name: FourCc, children: Vec<Mp4Box>) -> Self {
        Self {
            name,
            content: BoxContent::Container {
                prefix: Vec::new(),
                children,
                trailer: Vec::new(),
            },
        }
    }

    /// Parse a box payload, descending into known containers.
    pub(crate) fn parse(name: FourCc, payload: &[u8], depth: usize) -> Result<Self, SpatialMediaError> {
        if depth > MAX_DEPTH {
            return Err(SpatialMediaError::InvalidContainer(format!(
                "boxes nested deeper than {MAX_DEPTH} levels"
            )));
        }

        if PLAIN_CONTAINERS.contains(&&name) {
            let (children, trailer) = parse_children(payload, depth)?;
            return Ok(Self {
                name,
                content: BoxContent::Container {
                    prefix: Vec::new(),
                    children,
                    trailer,
                },
            });
        }

        if &name == b"stsd" && payload.len() >= 8 {
            let (children, trailer) = parse_children(&payload[8..], depth)?;
            return Ok(Self {
                name,
                content: BoxContent::Container {
                    prefix: payload[..8].to_vec(),
                    children,
                    trailer,
                },
            });
        }

        if is_audio_sample_entry(&name) {
            if let Some(prefix_len) = sound_description_prefix(payload) {
                // Video codecs reuse some of these four-character codes; keep
                // anything that does not parse as a sound description opaque.
                match parse_children(&payload[prefix_len..], depth) {
                    Ok((children, trailer)) => {
                        return Ok(Self {
                            name,
                            content: BoxContent::Container {
                                prefix: payload[..prefix_len].to_vec(),
                                children,
                                trailer,
                            },
                        });
                    }
                    Err(error) => {
                        log::debug!(
                            "Keeping '{}' sample entry opaque: {error}",
                            fourcc_str(&name)
                        );
                    }
                }
            }
        }

        Ok(Self::data(name, payload.to_vec()))
    }

    /// Payload length in bytes, excluding the header.
    pub fn payload_size(&self) -> u64 {
        match &self.content {
            BoxContent::Data(data) => data.len() as u64,
            BoxContent::Container {
                prefix,
                children,
                trailer,
            } => {
                prefix.len() as u64
                    + children.iter().map(Mp4Box::size).sum::<u64>()
                    + trailer.len() as u64
            }
        }
    }

    /// Total serialized size, header included.
    pub fn size(&self) -> u64 {
        let payload = self.payload_size();
        header_len(payload) + payload
    }

    /// Opaque payload, or `None` for containers.
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.content {
            BoxContent::Data(data) => Some(data),
            BoxContent::Container { .. } => None,
        }
    }

    /// Mutable opaque payload, or `None` for containers.
    pub fn payload_mut(&mut self) -> Option<&mut Vec<u8>> {
        match &mut self.content {
            BoxContent::Data(data) => Some(data),
            BoxContent::Container { .. } => None,
        }
    }

    /// Fixed fields preceding the children of a container.
    pub fn prefix(&self) -> &[u8] {
        match &self.content {
            BoxContent::Container { prefix, .. } => prefix,
            BoxContent::Data(_) => &[],
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.content, BoxContent::Container { .. })
    }

    /// Direct children; empty for data boxes.
    pub fn children(&self) -> &[Mp4Box] {
        match &self.content {
            BoxContent::Container { children, .. } => children,
            BoxContent::Data(_) => &[],
        }
    }

    /// Mutable direct children, or `None` for data boxes.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Mp4Box>> {
        match &mut self.content {
            BoxContent::Container { children, .. } => Some(children),
            BoxContent::Data(_) => None,
        }
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &FourCc) -> Option<&Mp4Box> {
        self.children().iter().find(|child| &child.name == name)
    }

    /// Follow a path of child names, e.g. `[b"mdia", b"hdlr"]`.
    pub fn find(&self, path: &[&FourCc]) -> Option<&Mp4Box> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.child(head)?.find(rest),
        }
    }

    pub fn find_mut(&mut self, path: &[&FourCc]) -> Option<&mut Mp4Box> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .children_mut()?
                .iter_mut()
                .find(|child| &child.name == *head)?
                .find_mut(rest),
        }
    }

    /// Remove every direct child matching `predicate`; returns how many went.
    pub fn remove_children<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Mp4Box) -> bool,
    {
        match self.children_mut() {
            Some(children) => {
                let before = children.len();
                children.retain(|child| !predicate(child));
                before - children.len()
            }
            None => 0,
        }
    }

    /// Visit this box and every descendant, depth first.
    pub fn visit_mut<F>(&mut self, f: &mut F) -> Result<(), SpatialMediaError>
    where
        F: FnMut(&mut Mp4Box) -> Result<(), SpatialMediaError>,
    {
        f(self)?;
        if let Some(children) = self.children_mut() {
            for child in children {
                child.visit_mut(f)?;
            }
        }
        Ok(())
    }

    /// For a `uuid` box, whether its user type equals `uuid`.
    pub fn has_user_type(&self, uuid: &[u8; 16]) -> bool {
        &self.name == b"uuid" && self.payload().is_some_and(|data| data.starts_with(uuid))
    }

    /// Handler type of a `trak` box, read from `mdia/hdlr`.
    pub fn handler_type(&self) -> Option<FourCc> {
        let hdlr = self.find(&[b"mdia", b"hdlr"])?.payload()?;
        let bytes = hdlr.get(8..12)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Serialize the box with its header, recomputing sizes.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_box_header(w, &self.name, self.payload_size())?;
        match &self.content {
            BoxContent::Data(data) => w.write_all(data)?,
            BoxContent::Container {
                prefix,
                children,
                trailer,
            } => {
                w.write_all(prefix)?;
                for child in children {
                    child.write_to(w)?;
                }
                w.write_all(trailer)?;
            }
        }
        Ok(())
    }

    /// Serialize the box into a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size() as usize);
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut out);
        out
    }
}

/// Channel count declared by a sound sample entry.
pub fn sample_entry_channel_count(entry: &Mp4Box) -> Option<u32> {
    let prefix = entry.prefix();
    match read_u16_at(prefix, 8)? {
        0 | 1 => read_u16_at(prefix, 16).map(u32::from),
        2 => read_u32_at(prefix, 40),
        _ => None,
    }
}
