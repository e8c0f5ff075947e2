//! Audio capture using PipeWire
//!
//! Connects an input stream to the default source and feeds every captured
//! block into the scope.

use anyhow::{anyhow, Result};
use log::{error, info};
use pipewire as pw;
use pw::spa;
use pw::spa::param::format::{MediaSubtype, MediaType};
use pw::spa::param::format_utils;
use pw::spa::pod::Pod;

use super::pcm;
use super::stream::{s16_mono_format, Startup, StreamCommand, StreamThread};
use super::LATENCY_HINT;
use crate::scope::SharedScope;

/// Live microphone capture; stops when dropped
pub struct AudioCapture {
    _thread: StreamThread,
}

impl AudioCapture {
    /// Open the default input device and start feeding `scope`
    pub fn start(scope: SharedScope) -> Result<Self> {
        let thread = StreamThread::spawn("pcmscope-capture", move |receiver, startup| {
            run_capture_loop(scope, receiver, startup)
        })?;
        Ok(Self { _thread: thread })
    }
}

/// Run the PipeWire capture loop on the current thread until stopped
fn run_capture_loop(
    scope: SharedScope,
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
        format: spa::param::audio::AudioInfoRaw,
        scope: SharedScope,
    }

    let user_data = UserData {
        format: Default::default(),
        scope,
    };

    let props = pw::properties::properties! {
        *pw::keys::MEDIA_TYPE => "Audio",
        *pw::keys::MEDIA_CATEGORY => "Capture",
        *pw::keys::MEDIA_ROLE => "Production",
        *pw::keys::APP_NAME => "pcmscope",
        *pw::keys::NODE_LATENCY => LATENCY_HINT,
    };

    let stream = pw::stream::StreamBox::new(&core, "pcmscope-capture", props)
        .map_err(|e| anyhow!("Failed to create PipeWire stream: {}", e))?;

    let _listener = stream
        .add_local_listener_with_user_data(user_data)
        .param_changed(|_, user_data, id, param| {
            let Some(param) = param else { return };
            if id != spa::param::ParamType::Format.as_raw() {
                return;
            }

            let (media_type, media_subtype) = match format_utils::parse_format(param) {
                Ok(v) => v,
                Err(_) => return,
            };

            if media_type != MediaType::Audio || media_subtype != MediaSubtype::Raw {
                return;
            }

            if let Err(e) = user_data.format.parse(param) {
                error!("Failed to parse capture format: {:?}", e);
                return;
            }
            info!(
                "Capture format negotiated: {} Hz, {} channel(s)",
                user_data.format.rate(),
                user_data.format.channels()
            );
        })
        .process(|stream, user_data| {
            let Some(mut buffer) = stream.dequeue_buffer() else {
                return;
            };

            let datas = buffer.datas_mut();
            if datas.is_empty() {
                return;
            }

            let data = &mut datas[0];
            let offset = data.chunk().offset() as usize;
            let size = data.chunk().size() as usize;
            let n_channels = user_data.format.channels().max(1) as usize;

            if let Some(bytes) = data.data() {
                let end = (offset + size).min(bytes.len());
                let start = offset.min(end);
                let samples = pcm::decode_s16le(&bytes[start..end]);

                // Keep the first channel if the graph hands us interleaved frames
                if n_channels > 1 {
                    let mono: Vec<i16> = samples.iter().step_by(n_channels).copied().collect();
                    user_data.scope.ingest(&mono);
                } else {
                    user_data.scope.ingest(&samples);
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
            spa::utils::Direction::Input,
            None,
            pw::stream::StreamFlags::AUTOCONNECT
                | pw::stream::StreamFlags::MAP_BUFFERS
                | pw::stream::StreamFlags::RT_PROCESS,
            &mut params,
        )
        .map_err(|e| anyhow!("Failed to connect capture stream: {}", e))?;

    info!("Capturing from the default PipeWire source");
    startup.ready();
    mainloop.run();

    Ok(())
}
