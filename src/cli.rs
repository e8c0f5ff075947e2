//! Command-line interface for pcmscope
//!
//! Handles argument parsing and logging configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::scope::DisplayMode;

/// pcmscope - draw live microphone or raw PCM audio as a waveform or level trace
#[derive(Parser, Debug)]
#[command(name = "pcmscope")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Replay a raw PCM file (S16LE, mono, 16kHz) instead of capturing the microphone
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// What to draw
    #[arg(short, long, value_enum, default_value_t = DisplayMode::Waveform)]
    pub mode: DisplayMode,

    /// Number of samples (waveform) or readings (level) kept on screen
    #[arg(long, value_name = "N")]
    pub capacity: Option<NonZeroUsize>,

    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace, -vvvv = also PipeWire and GPUI internals
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Ring capacity, falling back to the default for the chosen mode
    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity.unwrap_or_else(|| self.mode.default_capacity())
    }

    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);

    builder.filter_module("pcmscope", args.log_level());

    // Audio and GUI framework modules only at -vvvv
    if args.verbose >= 4 {
        builder.filter_module("pipewire", args.log_level());
        builder.filter_module("gpui", args.log_level());
        builder.filter_module("blade_graphics", args.log_level());
    }

    builder.format_timestamp_millis().init();
}
