//! Audio input for the scope using PipeWire
//!
//! This module provides:
//! - Microphone capture at 16kHz mono, S16LE
//! - Raw PCM file replay through a playback stream
//! - The ring buffer and decibel level computation behind the trace

mod capture;
mod handoff;
mod level;
mod pcm;
mod playback;
mod replay;
mod ring;
mod stream;

use std::path::Path;

use anyhow::Result;

use crate::scope::SharedScope;

pub use capture::AudioCapture;
pub use handoff::HandoffQueue;
pub use level::Level;
pub use playback::AudioPlayer;
pub use replay::FileReplay;
pub use ring::SampleRing;

/// Stream and file sample rate
pub const SAMPLE_RATE: u32 = 16_000;
/// Mono everywhere
pub const CHANNELS: u32 = 1;
/// Bytes per frame (one S16 sample)
pub const FRAME_BYTES: usize = 2;
/// Samples per replay chunk, also the requested stream quantum
pub const CHUNK_SAMPLES: usize = 1024;
pub const CHUNK_BYTES: usize = CHUNK_SAMPLES * FRAME_BYTES;
/// PipeWire `node.latency` hint matching `CHUNK_SAMPLES` at `SAMPLE_RATE`
const LATENCY_HINT: &str = "1024/16000";

/// Where samples come from
pub enum AudioSource {
    Microphone(AudioCapture),
    File(FileReplay),
}

impl AudioSource {
    /// Open the replay file if one is given, otherwise the default input
    pub fn start(file: Option<&Path>, scope: &SharedScope) -> Result<Self> {
        match file {
            Some(path) => FileReplay::start(path, scope.clone()).map(AudioSource::File),
            None => AudioCapture::start(scope.clone()).map(AudioSource::Microphone),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AudioSource::Microphone(_) => "microphone".to_string(),
            AudioSource::File(replay) => replay.path().display().to_string(),
        }
    }

    /// True once a replay has played all of its input
    pub fn is_finished(&self) -> bool {
        match self {
            AudioSource::Microphone(_) => false,
            AudioSource::File(replay) => replay.is_finished(),
        }
    }
}
