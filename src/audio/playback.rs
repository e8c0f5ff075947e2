//! Audio playback using PipeWire
//!
//! Plays bytes handed over by the replay reader. The process callback
//! blocks on the hand-off queue, so the stream runs without `RT_PROCESS`
//! and its callback stays on the stream's own loop thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::info;
use pipewire as pw;
use pw::spa;
use pw::spa::pod::Pod;

use super::stream::{s16_mono_format, Startup, StreamCommand, StreamThread};
use super::{HandoffQueue, CHUNK_BYTES, FRAME_BYTES, LATENCY_HINT};

/// Output stream draining a [`HandoffQueue`]; stops when dropped
pub struct AudioPlayer {
    thread: StreamThread,
    finished: Arc<AtomicBool>,
}

impl AudioPlayer {
    /// Open the default output device and start pulling from `queue`
    pub fn start(queue: HandoffQueue) -> Result<Self> {
        let finished = Arc::new(AtomicBool::new(false));
        let thread = StreamThread::spawn("pcmscope-playback", {
            let finished = finished.clone();
            move |receiver, startup| run_playback_loop(queue, finished, receiver, startup)
        })?;
        Ok(Self { thread, finished })
    }

    /// True once the queue was closed and every queued byte was played
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.thread.stop();
    }
}

/// Run the PipeWire playback loop on the current thread until stopped or drained
fn run_playback_loop(
    queue: HandoffQueue,
    finished: Arc<AtomicBool>,
    receiver: pw::channel::Receiver<StreamCommand>,
    startup: &Startup,
) -> Result<()> {
    pw::init();

    let mainloop = pw::main_loop::MainLoopRc::new(None)
        .map_err(|e| anyhow!("Failed to create PipeWire main loop: {}", e))?;

    let context = pw::context::ContextRc::new(&mainloop, None)
        .map_err(|e| anyhow!("Failed to create PipeWire context: {}", e))?;

    let core = context
        .connect_rc(None)
        .map_err(|e| anyhow!("Failed to connect to PipeWire: {}", e))?;

    let mainloop_weak = mainloop.downgrade();
    let _receiver = receiver.attach(mainloop.loop_(), move |cmd| match cmd {
        StreamCommand::Stop => {
            if let Some(mainloop) = mainloop_weak.upgrade() {
                mainloop.quit();
            }
        }
    });

    struct UserData {
        queue: HandoffQueue,
        finished: Arc<AtomicBool>,
        mainloop_weak: pw::main_loop::MainLoopWeak,
    }

    let user_data = UserData {
        queue,
        finished,
        mainloop_weak: mainloop.downgrade(),
    };

    let props = pw::properties::properties! {
        *pw::keys::MEDIA_TYPE => "Audio",
        *pw::keys::MEDIA_CATEGORY => "Playback",
        *pw::keys::MEDIA_ROLE => "Music",
        *pw::keys::APP_NAME => "pcmscope",
        *pw::keys::NODE_LATENCY => LATENCY_HINT,
    };

    let stream = pw::stream::StreamBox::new(&core, "pcmscope-playback", props)
        .map_err(|e| anyhow!("Failed to create PipeWire stream: {}", e))?;

    let _listener = stream
        .add_local_listener_with_user_data(user_data)
        .process(|stream, user_data| {
            let Some(mut buffer) = stream.dequeue_buffer() else {
                return;
            };

            let datas = buffer.datas_mut();
            if datas.is_empty() {
                return;
            }

            let data = &mut datas[0];
            let Some(slice) = data.data() else {
                return;
            };
            let fill = fill_from_queue(&user_data.queue, slice);

            let chunk = data.chunk_mut();
            *chunk.offset_mut() = 0;
            *chunk.stride_mut() = FRAME_BYTES as i32;
            *chunk.size_mut() = fill.size as u32;

            if fill.drained {
                if !user_data.finished.swap(true, Ordering::SeqCst) {
                    info!("Playback drained");
                }
                if let Some(mainloop) = user_data.mainloop_weak.upgrade() {
                    mainloop.quit();
                }
            }
        })
        .register()
        .map_err(|e| anyhow!("Failed to register stream listener: {}", e))?;

    let values = s16_mono_format()?;
    let pod = Pod::from_bytes(&values).ok_or_else(|| anyhow!("Invalid audio format pod"))?;
    let mut params = [pod];

    stream
        .connect(
            spa::utils::Direction::Output,
            None,
            pw::stream::StreamFlags::AUTOCONNECT | pw::stream::StreamFlags::MAP_BUFFERS,
            &mut params,
        )
        .map_err(|e| anyhow!("Failed to connect playback stream: {}", e))?;

    startup.ready();
    mainloop.run();

    Ok(())
}

/// Outcome of filling one output buffer
#[derive(Debug, PartialEq, Eq)]
struct Fill {
    /// Bytes of the buffer to hand to the stream
    size: usize,
    /// The queue is closed and has nothing left
    drained: bool,
}

/// Copy up to one chunk of whole frames from `queue` into `slice`, padding
/// a short final read with silence.
fn fill_from_queue(queue: &HandoffQueue, slice: &mut [u8]) -> Fill {
    // Never ask for more than one chunk: the reader only pauses above one
    // chunk, so this request can always be met.
    let wanted = slice.len().min(CHUNK_BYTES) / FRAME_BYTES * FRAME_BYTES;
    if wanted == 0 {
        return Fill {
            size: 0,
            drained: false,
        };
    }

    let got = queue.pop_into(&mut slice[..wanted]);
    slice[got..wanted].fill(0);
    Fill {
        size: if got == 0 { 0 } else { wanted },
        drained: got == 0,
    }
}
