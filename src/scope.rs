//! Shared scope state
//!
//! The audio producer ingests sample blocks and the view reads the whole
//! trace once per frame. Both go through one mutex: an ingest holds it for
//! a single block, a render pass for the full pass.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use log::trace;

use crate::audio::{Level, SampleRing};
use crate::render::{self, Scale};

/// What the trace shows
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DisplayMode {
    /// Raw sample amplitudes
    Waveform,
    /// One RMS decibel reading per audio block
    Level,
}

impl DisplayMode {
    /// Ring capacity used when none is given on the command line
    pub fn default_capacity(self) -> NonZeroUsize {
        match self {
            DisplayMode::Waveform => NonZeroUsize::new(1024),
            DisplayMode::Level => NonZeroUsize::new(800),
        }
        .unwrap_or(NonZeroUsize::MIN)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Waveform => f.write_str("waveform"),
            DisplayMode::Level => f.write_str("level"),
        }
    }
}

/// Ring contents for the active mode
#[derive(Debug)]
pub enum Trace {
    Waveform(SampleRing<i16>),
    Level(SampleRing<f32>),
}

impl Trace {
    pub fn new(mode: DisplayMode, capacity: NonZeroUsize) -> Self {
        match mode {
            DisplayMode::Waveform => Trace::Waveform(SampleRing::new(capacity)),
            DisplayMode::Level => Trace::Level(SampleRing::new(capacity)),
        }
    }

    pub fn mode(&self) -> DisplayMode {
        match self {
            Trace::Waveform(_) => DisplayMode::Waveform,
            Trace::Level(_) => DisplayMode::Level,
        }
    }

    /// Append one block: every sample in waveform mode, one reading in level mode
    pub fn ingest(&mut self, block: &[i16]) {
        match self {
            Trace::Waveform(ring) => ring.extend_from_slice(block),
            Trace::Level(ring) => {
                if block.is_empty() {
                    return;
                }
                let level = Level::measure(block);
                if let Level::BelowFloor(db) = level {
                    trace!("Block below the floor at {:.1} dB", db);
                }
                ring.push(level.display_db());
            }
        }
    }

    pub fn cursor(&self) -> usize {
        match self {
            Trace::Waveform(ring) => ring.cursor(),
            Trace::Level(ring) => ring.cursor(),
        }
    }

    /// Oldest-to-newest points for a plot `width` by `height` pixels
    pub fn points(&self, width: f32, height: f32) -> Vec<(f32, f32)> {
        match self {
            Trace::Waveform(ring) => render::plot(
                ring.oldest_first().map(f32::from),
                ring.capacity(),
                Scale::Amplitude,
                width,
                height,
            ),
            Trace::Level(ring) => render::plot(
                ring.oldest_first(),
                ring.capacity(),
                Scale::Decibels,
                width,
                height,
            ),
        }
    }
}

/// Thread-safe handle to the trace, cloned into the producer and the view
#[derive(Clone)]
pub struct SharedScope {
    inner: Arc<Mutex<Trace>>,
}

impl SharedScope {
    pub fn new(mode: DisplayMode, capacity: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Trace::new(mode, capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Trace> {
        // A panicking producer must not take the display down with it
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Process one block of incoming samples
    pub fn ingest(&self, block: &[i16]) {
        self.lock().ingest(block);
    }

    /// Run `f` with the trace locked for the whole pass
    pub fn render_pass<R>(&self, f: impl FnOnce(&Trace) -> R) -> R {
        let trace = self.lock();
        f(&trace)
    }

    pub fn mode(&self) -> DisplayMode {
        self.lock().mode()
    }

    /// Latest reading in level mode
    pub fn latest_level(&self) -> Option<f32> {
        match &*self.lock() {
            Trace::Level(ring) => Some(ring.latest()),
            Trace::Waveform(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_default_capacities() {
        assert_eq!(DisplayMode::Waveform.default_capacity().get(), 1024);
        assert_eq!(DisplayMode::Level.default_capacity().get(), 800);
    }

    #[test]
    fn test_level_ingest_advances_one_slot_per_block() {
        let scope = SharedScope::new(DisplayMode::Level, capacity(4));
        for expected_cursor in [1, 2, 3, 0, 1] {
            scope.ingest(&[100; 256]);
            assert_eq!(scope.render_pass(|t| t.cursor()), expected_cursor);
        }
        let latest = scope.latest_level().unwrap();
        assert!((latest - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_level_ingest_of_silence_stores_floor() {
        let scope = SharedScope::new(DisplayMode::Level, capacity(2));
        scope.ingest(&[0; 1024]);
        scope.render_pass(|trace| match trace {
            Trace::Level(ring) => assert_eq!(ring.as_slice(), &[0.0, 0.0]),
            Trace::Waveform(_) => panic!("wrong mode"),
        });
        assert_eq!(scope.latest_level(), Some(0.0));
    }

    #[test]
    fn test_empty_block_is_not_a_reading() {
        let scope = SharedScope::new(DisplayMode::Level, capacity(4));
        scope.ingest(&[]);
        assert_eq!(scope.render_pass(|t| t.cursor()), 0);
    }

    #[test]
    fn test_waveform_ingest_keeps_every_sample() {
        let scope = SharedScope::new(DisplayMode::Waveform, capacity(4));
        scope.ingest(&[10, 20, 30]);
        scope.ingest(&[40, 50]);

        scope.render_pass(|trace| {
            let Trace::Waveform(ring) = trace else {
                panic!("wrong mode");
            };
            assert_eq!(ring.as_slice(), &[50, 20, 30, 40]);
            assert_eq!(ring.cursor(), 1);
            assert_eq!(ring.oldest_first().collect::<Vec<_>>(), vec![20, 30, 40, 50]);
        });
        assert_eq!(scope.latest_level(), None);
    }

    #[test]
    fn test_points_follow_oldest_to_newest_order() {
        let scope = SharedScope::new(DisplayMode::Level, capacity(3));
        // readings of 0, 20 and 40 dB, then one more 20 dB pushes out the 0
        for amplitude in [0i16, 10, 100, 10] {
            scope.ingest(&[amplitude; 8]);
        }
        let points = scope.render_pass(|trace| trace.points(800.0, 600.0));
        assert_eq!(points.len(), 3);
        let ys: Vec<f32> = points.iter().map(|p| p.1.round()).collect();
        assert_eq!(ys, vec![500.0, 400.0, 500.0]);
    }

    #[test]
    fn test_newest_sample_is_last_point_when_ring_is_wider_than_plot() {
        let scope = SharedScope::new(DisplayMode::Waveform, capacity(1024));
        scope.ingest(&[0; 1023]);
        scope.ingest(&[i16::MAX]);

        let points = scope.render_pass(|trace| trace.points(800.0, 600.0));
        assert_eq!(points.len(), 800);
        assert_eq!(points.last().copied(), Some((799.0, 0.0)));
        assert!(points[..799].iter().all(|p| p.1 == 300.0));
    }

    #[test]
    fn test_concurrent_ingest_and_render() {
        let scope = SharedScope::new(DisplayMode::Waveform, capacity(64));
        let producer = {
            let scope = scope.clone();
            thread::spawn(move || {
                for i in 0..500i16 {
                    scope.ingest(&[i; 16]);
                }
            })
        };

        for _ in 0..200 {
            let n = scope.render_pass(|trace| trace.points(800.0, 600.0).len());
            assert_eq!(n, 64);
        }
        producer.join().unwrap();

        // every block fills 16 slots with one value, so the last 64 are
        // four whole blocks
        scope.render_pass(|trace| {
            let Trace::Waveform(ring) = trace else {
                panic!("wrong mode");
            };
            let values: Vec<i16> = ring.oldest_first().collect();
            assert_eq!(&values[..16], &[496; 16]);
            assert_eq!(&values[48..], &[499; 16]);
        });
    }
}
