//! pcmscope - a real-time audio scope for Linux
//!
//! Captures the microphone (or replays a raw PCM file) through PipeWire and
//! draws the signal as a waveform or decibel trace in a GPUI window.

mod app;
mod audio;
mod cli;
mod render;
mod scope;

use anyhow::Result;
use app::ScopeView;
use audio::AudioSource;
use clap::Parser;
use gpui::*;
use log::{error, info};
use scope::SharedScope;

fn main() -> Result<()> {
    // Parse command-line arguments and initialize logging
    let args = cli::Args::parse();
    cli::init_logging(&args);

    let mode = args.mode;
    let capacity = args.capacity();
    info!("Starting pcmscope: {} trace, {} slots", mode, capacity);

    let scope = SharedScope::new(mode, capacity);
    let source = AudioSource::start(args.file.as_deref(), &scope)?;
    info!("Reading audio from {}", source.describe());

    let title = format!("pcmscope - {}", source.describe());
    let (width, height) = (args.width as f32, args.height as f32);

    Application::new().run(move |cx: &mut App| {
        // Closing the scope window ends the process
        cx.on_window_closed(|cx| cx.quit()).detach();

        let bounds = Bounds::centered(None, size(px(width), px(height)), cx);
        let opened = cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                titlebar: Some(TitlebarOptions {
                    title: Some(title.into()),
                    ..Default::default()
                }),
                app_id: Some("pcmscope".to_string()),
                ..Default::default()
            },
            |_window, cx| cx.new(|cx| ScopeView::new(scope, source, cx)),
        );

        if let Err(e) = opened {
            error!("Failed to open window: {:#}", e);
            std::process::exit(1);
        }
        cx.activate(true);
    });

    Ok(())
}
