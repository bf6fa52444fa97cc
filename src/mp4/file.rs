//! Top-level file layout: load, modify `moov`, save.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use crate::error::SpatialMediaError;
use crate::progress::{ProgressCallback, ProgressTracker};

use super::header::{FourCc, fourcc_str, read_box_header, read_u32_at, read_u64_at};
use super::tree::Mp4Box;

const COPY_BUFFER_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    /// The parsed `moov` box.
    Moov,
    /// A byte range copied verbatim from the source.
    Source { name: FourCc, offset: u64, size: u64 },
}

/// An MP4/MOV file whose `moov` box is held in memory.
///
/// All other top-level boxes stay in the source file and are streamed
/// through on [`save`](Mp4File::save).
#[derive(Debug, Clone)]
pub struct Mp4File {
    pub moov: Mp4Box,
    moov_offset: u64,
    moov_original_size: u64,
    segments: Vec<Segment>,
}

impl Mp4File {
    /// Scan the top-level boxes of `reader` and parse `moov`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialMediaError::InvalidContainer`] if a box overruns the
    /// file, or if there is not exactly one `moov` box.
    pub fn load<R: Read + Seek>(reader: &mut R) -> Result<Self, SpatialMediaError> {
        let len = reader.seek(SeekFrom::End(0))?;
        let mut segments = Vec::new();
        let mut moov = None;
        let mut pos = 0u64;

        while pos < len {
            if len - pos < 8 {
                log::debug!("Keeping {} trailing bytes after the last box", len - pos);
                segments.push(Segment::Source {
                    name: [0; 4],
                    offset: pos,
                    size: len - pos,
                });
                break;
            }

            reader.seek(SeekFrom::Start(pos))?;
            let header = read_box_header(reader).map_err(|error| {
                if error.kind() == ErrorKind::UnexpectedEof {
                    SpatialMediaError::InvalidContainer(format!(
                        "truncated box header at offset {pos}"
                    ))
                } else {
                    SpatialMediaError::IoError(error)
                }
            })?;
            let size = if header.size == 0 { len - pos } else { header.size };
            if size < header.header_size || size > len - pos {
                return Err(SpatialMediaError::InvalidContainer(format!(
                    "top-level box '{}' at offset {pos} has size {size} but the file has only {} bytes left",
                    fourcc_str(&header.name),
                    len - pos
                )));
            }

            if &header.name == b"moov" {
                if moov.is_some() {
                    return Err(SpatialMediaError::InvalidContainer(
                        "file contains more than one moov box".to_string(),
                    ));
                }
                let mut payload = vec![0u8; (size - header.header_size) as usize];
                reader.read_exact(&mut payload)?;
                moov = Some((Mp4Box::parse(header.name, &payload, 0)?, pos, size));
                segments.push(Segment::Moov);
            } else {
                segments.push(Segment::Source {
                    name: header.name,
                    offset: pos,
                    size,
                });
            }
            pos += size;
        }

        let (moov, moov_offset, moov_original_size) = moov.ok_or_else(|| {
            SpatialMediaError::InvalidContainer("no moov box found".to_string())
        })?;

        log::debug!(
            "Loaded {} top-level boxes, moov at offset {moov_offset} ({moov_original_size} bytes)",
            segments.len()
        );

        Ok(Self {
            moov,
            moov_offset,
            moov_original_size,
            segments,
        })
    }

    /// Names of the top-level boxes in file order.
    pub fn top_level_names(&self) -> Vec<FourCc> {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Moov => *b"moov",
                Segment::Source { name, .. } => *name,
            })
            .collect()
    }

    /// Direct `trak` children of `moov`.
    pub fn tracks(&self) -> impl Iterator<Item = &Mp4Box> {
        self.moov
            .children()
            .iter()
            .filter(|child| &child.name == b"trak")
    }

    /// Size of the output [`save`](Mp4File::save) will produce.
    pub fn output_size(&self) -> u64 {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Moov => self.moov.size(),
                Segment::Source { size, .. } => *size,
            })
            .sum()
    }

    /// Write the file to `writer`, streaming unmodified boxes from `reader`.
    ///
    /// Chunk offsets that point past the original `moov` position are moved
    /// by however much `moov` grew or shrank.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialMediaError::ChunkOffsetOverflow`] if a 32-bit chunk
    /// offset can no longer represent its target, or an I/O error.
    pub fn save<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        progress: &dyn ProgressCallback,
    ) -> Result<(), SpatialMediaError> {
        let mut moov = self.moov.clone();
        let delta = moov.size() as i64 - self.moov_original_size as i64;
        if delta != 0 {
            let shifted = shift_chunk_offsets(&mut moov, self.moov_offset, delta)?;
            log::debug!("moov changed by {delta} bytes, shifted {shifted} chunk offsets");
        }

        let mut tracker = ProgressTracker::new(progress, Some(self.output_size()));
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        for segment in &self.segments {
            match *segment {
                Segment::Moov => {
                    let bytes = moov.to_bytes();
                    writer.write_all(&bytes)?;
                    tracker.advance(bytes.len() as u64);
                }
                Segment::Source { name, offset, size } => {
                    reader.seek(SeekFrom::Start(offset))?;
                    let mut remaining = size;
                    while remaining > 0 {
                        let want = remaining.min(buffer.len() as u64) as usize;
                        let read = reader.read(&mut buffer[..want])?;
                        if read == 0 {
                            return Err(SpatialMediaError::InvalidContainer(format!(
                                "source ended inside '{}' box",
                                fourcc_str(&name)
                            )));
                        }
                        writer.write_all(&buffer[..read])?;
                        remaining -= read as u64;
                        tracker.advance(read as u64);
                    }
                }
            }
        }

        writer.flush()?;
        Ok(())
    }
}

/// Move every `stco`/`co64` entry at or beyond `threshold` by `delta` bytes.
///
/// Returns the number of entries changed.
pub(crate) fn shift_chunk_offsets(
    root: &mut Mp4Box,
    threshold: u64,
    delta: i64,
) -> Result<usize, SpatialMediaError> {
    let mut shifted = 0usize;
    root.visit_mut(&mut |node: &mut Mp4Box| {
        let width = match &node.name {
            b"stco" => 4,
            b"co64" => 8,
            _ => return Ok(()),
        };
        let name = fourcc_str(&node.name);
        let Some(payload) = node.payload_mut() else {
            return Ok(());
        };

        let count = read_u32_at(payload, 4).ok_or_else(|| {
            SpatialMediaError::InvalidContainer(format!("{name} box is too short"))
        })? as usize;
        if payload.len() < 8 + count * width {
            return Err(SpatialMediaError::InvalidContainer(format!(
                "{name} box declares {count} entries but holds {} bytes",
                payload.len()
            )));
        }

        for index in 0..count {
            let at = 8 + index * width;
            let offset = if width == 4 {
                read_u32_at(payload, at).map(u64::from)
            } else {
                read_u64_at(payload, at)
            }
            .unwrap_or_default();
            if offset < threshold {
                continue;
            }

            let moved = offset
                .checked_add_signed(delta)
                .ok_or(SpatialMediaError::ChunkOffsetOverflow { offset, delta })?;
            if width == 4 {
                let moved = u32::try_from(moved)
                    .map_err(|_| SpatialMediaError::ChunkOffsetOverflow { offset, delta })?;
                payload[at..at + 4].copy_from_slice(&moved.to_be_bytes());
            } else {
                payload[at..at + 8].copy_from_slice(&moved.to_be_bytes());
            }
            shifted += 1;
        }
        Ok(())
    })?;
    Ok(shifted)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::progress::NoOpProgress;

    fn stco(offsets: &[u32]) -> Mp4Box {
        let mut payload = vec![0, 0, 0, 0];
        payload.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
        for offset in offsets {
            payload.extend_from_slice(&offset.to_be_bytes());
        }
        Mp4Box::data(*b"stco", payload)
    }

    fn co64(offsets: &[u64]) -> Mp4Box {
        let mut payload = vec![0, 0, 0, 0];
        payload.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
        for offset in offsets {
            payload.extend_from_slice(&offset.to_be_bytes());
        }
        Mp4Box::data(*b"co64", payload)
    }

    fn stbl_with(table: Mp4Box) -> Mp4Box {
        Mp4Box::container(
            *b"moov",
            vec![Mp4Box::container(
                *b"trak",
                vec![Mp4Box::container(
                    *b"mdia",
                    vec![Mp4Box::container(
                        *b"minf",
                        vec![Mp4Box::container(*b"stbl", vec![table])],
                    )],
                )],
            )],
        )
    }

    fn offsets_of(root: &Mp4Box, name: &FourCc) -> Vec<u64> {
        let table = root
            .find(&[b"trak", b"mdia", b"minf", b"stbl", name])
            .unwrap()
            .payload()
            .unwrap();
        let count = read_u32_at(table, 4).unwrap() as usize;
        (0..count)
            .map(|i| {
                if name == b"stco" {
                    read_u32_at(table, 8 + i * 4).unwrap() as u64
                } else {
                    read_u64_at(table, 8 + i * 8).unwrap()
                }
            })
            .collect()
    }

    #[test]
    fn shifts_only_offsets_after_threshold() {
        let mut root = stbl_with(stco(&[10, 100, 200]));
        let shifted = shift_chunk_offsets(&mut root, 50, 24).unwrap();
        assert_eq!(shifted, 2);
        assert_eq!(offsets_of(&root, b"stco"), vec![10, 124, 224]);
    }

    #[test]
    fn shifts_co64_entries() {
        let mut root = stbl_with(co64(&[0x1_0000_0000, 40]));
        shift_chunk_offsets(&mut root, 32, -8).unwrap();
        assert_eq!(offsets_of(&root, b"co64"), vec![0x1_0000_0000 - 8, 32]);
    }

    #[test]
    fn stco_overflow_is_reported() {
        let mut root = stbl_with(stco(&[u32::MAX - 4]));
        let error = shift_chunk_offsets(&mut root, 0, 16).unwrap_err();
        assert!(matches!(
            error,
            SpatialMediaError::ChunkOffsetOverflow { delta: 16, .. }
        ));
    }

    #[test]
    fn truncated_table_is_rejected() {
        let mut table = stco(&[1, 2]);
        table.payload_mut().unwrap().truncate(12);
        let mut root = stbl_with(table);
        assert!(shift_chunk_offsets(&mut root, 0, 8).is_err());
    }

    fn raw(name: &FourCc, payload: &[u8]) -> Vec<u8> {
        let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(name);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn load_requires_moov() {
        let bytes = raw(b"ftyp", b"isom\0\0\0\0");
        let error = Mp4File::load(&mut Cursor::new(bytes)).unwrap_err();
        assert!(error.to_string().contains("no moov box"), "{error}");
    }

    #[test]
    fn load_rejects_garbage() {
        let error = Mp4File::load(&mut Cursor::new(b"this is not a media file".to_vec())).unwrap_err();
        assert!(matches!(error, SpatialMediaError::InvalidContainer(_)));
    }

    #[test]
    fn load_rejects_largesize_header_cut_short() {
        let mut bytes = raw(b"moov", &[]);
        bytes.extend_from_slice(&[0, 0, 0, 1]);
        bytes.extend_from_slice(b"free");
        bytes.extend_from_slice(&[0, 0]);
        let error = Mp4File::load(&mut Cursor::new(bytes)).unwrap_err();
        assert!(
            matches!(error, SpatialMediaError::InvalidContainer(ref message) if message.contains("offset 8")),
            "{error}"
        );
    }

    #[test]
    fn load_rejects_duplicate_moov() {
        let mut bytes = raw(b"moov", &[]);
        bytes.extend(raw(b"moov", &[]));
        assert!(Mp4File::load(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn unchanged_file_round_trips() {
        let mut bytes = raw(b"ftyp", b"isom\0\0\0\0");
        bytes.extend(raw(b"moov", &raw(b"free", &[1, 2, 3])));
        bytes.extend(raw(b"mdat", &[9; 32]));
        bytes.extend_from_slice(&[7, 7, 7]);

        let mut source = Cursor::new(bytes.clone());
        let file = Mp4File::load(&mut source).unwrap();
        assert_eq!(
            file.top_level_names(),
            vec![*b"ftyp", *b"moov", *b"mdat", [0; 4]]
        );

        let mut out = Vec::new();
        file.save(&mut source, &mut out, &NoOpProgress).unwrap();
        assert_eq!(out, bytes);
        assert_eq!(file.output_size(), bytes.len() as u64);
    }
}
