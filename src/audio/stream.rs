//! PipeWire plumbing shared by the capture and playback streams

use std::cell::Cell;
use std::io::Cursor;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use log::{debug, error};
use pipewire as pw;
use pw::spa;

use super::{CHANNELS, SAMPLE_RATE};

pub enum StreamCommand {
    Stop,
}

/// Reports the outcome of stream setup back to the spawning thread
pub struct Startup {
    tx: mpsc::Sender<Result<()>>,
    reported: Cell<bool>,
}

impl Startup {
    /// Call once the stream is connected, right before running the loop
    pub fn ready(&self) {
        self.reported.set(true);
        let _ = self.tx.send(Ok(()));
    }
}

/// A PipeWire main loop running a single stream on its own thread
pub struct StreamThread {
    name: String,
    sender: Option<pw::channel::Sender<StreamCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    /// Spawn `body` on a named thread and wait until it reports the stream
    /// as started. A setup error is returned here instead of being logged.
    pub fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(pw::channel::Receiver<StreamCommand>, &Startup) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = pw::channel::channel::<StreamCommand>();
        let (tx, rx) = mpsc::channel();

        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let startup = Startup {
                    tx,
                    reported: Cell::new(false),
                };
                match body(receiver, &startup) {
                    Ok(()) => debug!("{} loop finished", thread_name),
                    Err(e) if startup.reported.get() => {
                        error!("{} failed: {:#}", thread_name, e)
                    }
                    Err(e) => {
                        let _ = startup.tx.send(Err(e));
                    }
                }
            })
            .with_context(|| format!("Failed to spawn {} thread", name))?;

        let started = rx
            .recv()
            .unwrap_or_else(|_| Err(anyhow!("{} exited before its stream started", name)));
        if let Err(e) = started {
            let _ = handle.join();
            return Err(e);
        }

        debug!("{} started", name);
        Ok(Self {
            name: name.to_string(),
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Ask the loop to quit and wait for the thread
    pub fn stop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(StreamCommand::Stop);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("{} thread panicked", self.name);
            }
            debug!("{} stopped", self.name);
        }
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Serialized `EnumFormat` pod requesting S16LE mono at `SAMPLE_RATE`
pub fn s16_mono_format() -> Result<Vec<u8>> {
    let mut audio_info = spa::param::audio::AudioInfoRaw::new();
    audio_info.set_format(spa::param::audio::AudioFormat::S16LE);
    audio_info.set_rate(SAMPLE_RATE);
    audio_info.set_channels(CHANNELS);

    let obj = spa::pod::Object {
        type_: spa::utils::SpaTypes::ObjectParamFormat.as_raw(),
        id: spa::param::ParamType::EnumFormat.as_raw(),
        properties: audio_info.into(),
    };

    let values = spa::pod::serialize::PodSerializer::serialize(
        Cursor::new(Vec::new()),
        &spa::pod::Value::Object(obj),
    )
    .map_err(|e| anyhow!("Failed to serialize audio format: {:?}", e))?
    .0
    .into_inner();

    Ok(values)
}
