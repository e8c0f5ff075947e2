//! Raw PCM file replay
//!
//! A reader thread pulls fixed-size chunks from the file, ingests each one
//! into the scope and hands its bytes to the playback stream. At end of
//! input the queue is closed: playback drains and stops, the window keeps
//! showing the last trace.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::{bail, Context, Result};
use log::{debug, error, info};

use super::pcm::{self, PcmChunks};
use super::{AudioPlayer, HandoffQueue, CHUNK_BYTES};
use crate::scope::SharedScope;

/// How a replay pump ended
#[derive(Debug, PartialEq, Eq)]
pub enum ReplayEnd {
    /// All input was read and queued
    EndOfInput { bytes: u64 },
    /// The queue was closed by the consumer side first
    Cancelled { bytes: u64 },
}

/// Plays a raw PCM file while feeding the scope; stops when dropped
pub struct FileReplay {
    path: PathBuf,
    queue: HandoffQueue,
    player: AudioPlayer,
    reader: Option<JoinHandle<()>>,
}

impl FileReplay {
    /// Open `path` and start playback. A missing or unreadable file is an error.
    pub fn start(path: &Path, scope: SharedScope) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let metadata = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if !metadata.is_file() {
            bail!("{} is not a regular file", path.display());
        }
        info!(
            "Replaying {} ({} bytes, {:.1}s)",
            path.display(),
            metadata.len(),
            duration_seconds(metadata.len())
        );

        let queue = HandoffQueue::new(CHUNK_BYTES);
        let player = AudioPlayer::start(queue.clone())?;

        let reader = thread::Builder::new()
            .name("pcmscope-reader".to_string())
            .spawn({
                let queue = queue.clone();
                let name = path.display().to_string();
                move || match pump(file, &scope, &queue) {
                    Ok(ReplayEnd::EndOfInput { bytes }) => {
                        info!("End of {} after {} bytes", name, bytes)
                    }
                    Ok(ReplayEnd::Cancelled { bytes }) => {
                        debug!("Replay of {} cancelled after {} bytes", name, bytes)
                    }
                    Err(e) => {
                        error!("Failed to read {}: {}", name, e);
                        std::process::exit(1);
                    }
                }
            })
            .context("Failed to spawn replay reader thread")?;

        Ok(Self {
            path: path.to_path_buf(),
            queue,
            player,
            reader: Some(reader),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once every byte of the file has been played
    pub fn is_finished(&self) -> bool {
        self.player.is_finished()
    }
}

impl Drop for FileReplay {
    fn drop(&mut self) {
        // Closing first releases both the reader and a blocked playback callback
        self.queue.close();
        self.player.stop();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                error!("Replay reader for {} panicked", self.path.display());
            }
        }
    }
}

/// Read `reader` chunk by chunk, ingest each chunk into `scope` and push its
/// bytes into `queue`. The queue is closed on return in every case.
pub fn pump<R: Read>(reader: R, scope: &SharedScope, queue: &HandoffQueue) -> io::Result<ReplayEnd> {
    let result = pump_chunks(PcmChunks::new(reader), scope, queue);
    queue.close();
    result
}

fn pump_chunks<R: Read>(
    mut chunks: PcmChunks<R>,
    scope: &SharedScope,
    queue: &HandoffQueue,
) -> io::Result<ReplayEnd> {
    let mut bytes = 0u64;
    while let Some(chunk) = chunks.next_chunk()? {
        scope.ingest(&pcm::decode_s16le(&chunk));
        if !queue.push(&chunk) {
            return Ok(ReplayEnd::Cancelled { bytes });
        }
        bytes += chunk.len() as u64;
    }
    Ok(ReplayEnd::EndOfInput { bytes })
}

/// Playing time of `bytes` of S16 mono at the stream rate
fn duration_seconds(bytes: u64) -> f64 {
    (bytes / super::FRAME_BYTES as u64) as f64 / f64::from(super::SAMPLE_RATE)
}
