//! Sample-to-pixel mapping for one render pass
//!
//! Points are produced by direct index mapping with an integer stride,
//! counted back from the newest sample so it always lands on the last
//! column. There is no interpolation or resampling.

/// Vertical pixels per decibel in level mode
pub const PIXELS_PER_DB: f32 = 5.0;

/// How sample values map to the vertical axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scale {
    /// Signed amplitude, centred on the middle of the plot
    Amplitude,
    /// Decibels above the floor, rising from the bottom edge
    Decibels,
}

impl Scale {
    /// Vertical offset (from the top) for `value` in a plot `height` tall
    pub fn y(self, value: f32, height: f32) -> f32 {
        let y = match self {
            Scale::Amplitude => {
                let half = height / 2.0;
                half - value / f32::from(i16::MAX) * half
            }
            Scale::Decibels => height - value * PIXELS_PER_DB,
        };
        y.clamp(0.0, height)
    }
}

/// Map `len` values (oldest first) to `(x, y)` points across `width` pixels.
///
/// Every `stride`-th value is drawn, where `stride = max(1, len / width)`,
/// and at most one point is produced per pixel column. The mapping is
/// anchored at the newest end: the last value always lands on the last
/// point, and the oldest values are the ones left off when they don't fit.
pub fn plot<I>(values: I, len: usize, scale: Scale, width: f32, height: f32) -> Vec<(f32, f32)>
where
    I: Iterator<Item = f32>,
{
    let columns = width.max(0.0) as usize;
    if columns == 0 || len == 0 {
        return Vec::new();
    }
    let stride = (len / columns).max(1);
    let drawn = columns.min(len.div_ceil(stride));
    let skip = len - 1 - stride * (drawn - 1);

    values
        .skip(skip)
        .step_by(stride)
        .take(columns)
        .enumerate()
        .map(|(i, value)| (i as f32, scale.y(value, height)))
        .collect()
}
