//! Synthetic MP4 fixtures.
//!
//! Builds small but structurally complete files (ftyp, moov with video and
//! audio tracks, mdat) so the integration tests need no binary fixtures.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use spatialmedia::mp4::{Mp4Box, Mp4File};

pub const VIDEO_SAMPLE: [u8; 64] = [0xAA; 64];
pub const AUDIO_SAMPLE: [u8; 32] = [0xBB; 32];

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub video: bool,
    /// Channel count of the audio track; `None` for no audio track.
    pub audio_channels: Option<u16>,
    /// Sound description version of the `mp4a` entry (0, 1 or 2).
    pub sound_version: u16,
    /// Place `moov` before `mdat` (fast start) or after it.
    pub moov_first: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            video: true,
            audio_channels: Some(4),
            sound_version: 0,
            moov_first: true,
        }
    }
}

fn bx(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(name);
    out.extend_from_slice(payload);
    out
}

fn cat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.concat()
}

fn hdlr(handler: &[u8; 4], name: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    payload.extend_from_slice(handler);
    payload.extend_from_slice(&[0u8; 12]);
    payload.extend_from_slice(name.as_bytes());
    payload.push(0);
    bx(b"hdlr", &payload)
}

fn stco(offset: u32) -> Vec<u8> {
    let mut payload = vec![0, 0, 0, 0, 0, 0, 0, 1];
    payload.extend_from_slice(&offset.to_be_bytes());
    bx(b"stco", &payload)
}

fn sample_tables(entry: Vec<u8>, sample_size: u32, offset: u32) -> Vec<u8> {
    let mut stsd = vec![0, 0, 0, 0, 0, 0, 0, 1];
    stsd.extend(entry);
    let stts = bx(b"stts", &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 4, 0]);
    let stsc = bx(b"stsc", &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1]);
    let mut stsz = vec![0u8; 4];
    stsz.extend_from_slice(&sample_size.to_be_bytes());
    stsz.extend_from_slice(&1u32.to_be_bytes());
    bx(
        b"stbl",
        &cat(&[bx(b"stsd", &stsd), stts, stsc, bx(b"stsz", &stsz), stco(offset)]),
    )
}

fn dinf() -> Vec<u8> {
    let url = bx(b"url ", &[0, 0, 0, 1]);
    let mut dref = vec![0, 0, 0, 0, 0, 0, 0, 1];
    dref.extend(url);
    bx(b"dinf", &bx(b"dref", &dref))
}

fn video_trak(offset: u32) -> Vec<u8> {
    let mut avc1 = vec![0u8; 78];
    avc1[7] = 1;
    avc1[24..26].copy_from_slice(&1920u16.to_be_bytes());
    avc1[26..28].copy_from_slice(&960u16.to_be_bytes());
    let minf = bx(
        b"minf",
        &cat(&[
            bx(b"vmhd", &[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]),
            dinf(),
            sample_tables(bx(b"avc1", &avc1), VIDEO_SAMPLE.len() as u32, offset),
        ]),
    );
    let mdia = bx(
        b"mdia",
        &cat(&[bx(b"mdhd", &[0u8; 24]), hdlr(b"vide", "VideoHandler"), minf]),
    );
    bx(b"trak", &cat(&[bx(b"tkhd", &[0u8; 84]), mdia]))
}

fn sound_entry(channels: u16, version: u16) -> Vec<u8> {
    let prefix_len = match version {
        0 => 28,
        1 => 44,
        _ => 64,
    };
    let mut payload = vec![0u8; prefix_len];
    payload[7] = 1;
    payload[8..10].copy_from_slice(&version.to_be_bytes());
    if version == 2 {
        payload[16..18].copy_from_slice(&3u16.to_be_bytes());
        payload[40..44].copy_from_slice(&u32::from(channels).to_be_bytes());
    } else {
        payload[16..18].copy_from_slice(&channels.to_be_bytes());
        payload[18..20].copy_from_slice(&16u16.to_be_bytes());
    }
    payload.extend(bx(b"esds", &[0u8; 20]));
    bx(b"mp4a", &payload)
}

fn audio_trak(channels: u16, version: u16, offset: u32) -> Vec<u8> {
    let minf = bx(
        b"minf",
        &cat(&[
            bx(b"smhd", &[0u8; 8]),
            dinf(),
            sample_tables(sound_entry(channels, version), AUDIO_SAMPLE.len() as u32, offset),
        ]),
    );
    let mdia = bx(
        b"mdia",
        &cat(&[bx(b"mdhd", &[0u8; 24]), hdlr(b"soun", "SoundHandler"), minf]),
    );
    bx(b"trak", &cat(&[bx(b"tkhd", &[0u8; 84]), mdia]))
}

fn moov(fixture: &Fixture, video_offset: u32, audio_offset: u32) -> Vec<u8> {
    let mut parts = vec![bx(b"mvhd", &[0u8; 100])];
    if fixture.video {
        parts.push(video_trak(video_offset));
    }
    if let Some(channels) = fixture.audio_channels {
        parts.push(audio_trak(channels, fixture.sound_version, audio_offset));
    }
    bx(b"moov", &cat(&parts))
}

/// Serialize a fixture file.
pub fn build_mp4(fixture: &Fixture) -> Vec<u8> {
    let ftyp = bx(b"ftyp", b"isom\0\0\x02\0isomiso2mp41");
    let mdat = bx(b"mdat", &cat(&[VIDEO_SAMPLE.to_vec(), AUDIO_SAMPLE.to_vec()]));
    // Offsets do not change the moov size, so measure with placeholders first.
    let moov_len = moov(fixture, 0, 0).len();

    let mdat_start = if fixture.moov_first {
        ftyp.len() + moov_len
    } else {
        ftyp.len()
    };
    let video_offset = (mdat_start + 8) as u32;
    let audio_offset = video_offset + VIDEO_SAMPLE.len() as u32;
    let moov = moov(fixture, video_offset, audio_offset);

    if fixture.moov_first {
        cat(&[ftyp, moov, mdat])
    } else {
        cat(&[ftyp, mdat, moov])
    }
}

/// Write a fixture into `dir` under `name`.
pub fn write_fixture(dir: &Path, name: &str, fixture: &Fixture) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_mp4(fixture)).expect("Failed to write fixture");
    path
}

pub fn load(path: &Path) -> Mp4File {
    let mut file = std::fs::File::open(path).expect("Failed to open output");
    Mp4File::load(&mut file).expect("Failed to parse output")
}

/// The single chunk offset of the track with the given handler.
pub fn chunk_offset(mp4: &Mp4File, handler: &[u8; 4]) -> u64 {
    let trak = mp4
        .tracks()
        .find(|trak| trak.handler_type().as_ref() == Some(handler))
        .expect("track not found");
    let stco = trak
        .find(&[b"mdia", b"minf", b"stbl", b"stco"])
        .and_then(Mp4Box::payload)
        .expect("stco not found");
    u32::from_be_bytes([stco[8], stco[9], stco[10], stco[11]]) as u64
}

/// Check both sample payloads are still where the chunk offsets say.
pub fn assert_samples_addressable(path: &Path) {
    let bytes = std::fs::read(path).expect("Failed to read output");
    let mp4 = load(path);
    let video = chunk_offset(&mp4, b"vide") as usize;
    assert_eq!(&bytes[video..video + VIDEO_SAMPLE.len()], &VIDEO_SAMPLE);
    if mp4.tracks().any(|trak| trak.handler_type() == Some(*b"soun")) {
        let audio = chunk_offset(&mp4, b"soun") as usize;
        assert_eq!(&bytes[audio..audio + AUDIO_SAMPLE.len()], &AUDIO_SAMPLE);
    }
}
