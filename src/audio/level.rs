//! RMS decibel level of a block of 16-bit samples
//!
//! The level is `10 * log10(mean(sample^2))`, i.e. power in dB relative to
//! one LSB. Display values are floored at [`FLOOR_DB`].

/// Lowest level drawn on the trace
pub const FLOOR_DB: f32 = 0.0;

/// Level of one block
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Level {
    /// Empty block or every sample zero; the log is undefined
    Silence,
    /// A real reading under the floor (mean square below 1)
    BelowFloor(f32),
    /// A reading at or above the floor
    Decibels(f32),
}

impl Level {
    /// Measure a block of samples
    pub fn measure(samples: &[i16]) -> Self {
        let mean_square = mean_square(samples);
        if mean_square <= 0.0 {
            return Level::Silence;
        }

        let db = (10.0 * mean_square.log10()) as f32;
        if db < FLOOR_DB {
            Level::BelowFloor(db)
        } else {
            Level::Decibels(db)
        }
    }

    /// Value stored in the trace, never below the floor
    pub fn display_db(self) -> f32 {
        match self {
            Level::Silence | Level::BelowFloor(_) => FLOOR_DB,
            Level::Decibels(db) => db,
        }
    }
}

/// Mean of squared samples, accumulated in f64 so long blocks cannot overflow
pub fn mean_square(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let s = f64::from(s);
            s * s
        })
        .sum();
    sum_squares / samples.len() as f64
}
