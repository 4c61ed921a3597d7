//! Overlapping Window Segmentation

use crate::PhaseCurrents;
use data_validator::{ConfigError, WindowingConfig};

/// Read-only view over one window of three-phase samples
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub index: usize,
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
    pub r: &'a [f64],
    pub s: &'a [f64],
    pub t: &'a [f64],
}

impl<'a> Window<'a> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Slices phase channels into fixed-size windows at a fixed step
#[derive(Debug, Clone)]
pub struct WindowSegmenter {
    window_size: usize,
    step: usize,
}

impl WindowSegmenter {
    /// Create a segmenter, failing when the configured step is not positive
    pub fn new(config: &WindowingConfig) -> Result<Self, ConfigError> {
        let step = config.validate()?;
        Ok(Self {
            window_size: config.window_size,
            step,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Windows at offsets 0, step, 2*step, ... while offset + size fits.
    /// Trailing samples that cannot fill a window are not emitted.
    pub fn segment<'a>(&self, currents: &'a PhaseCurrents) -> Windows<'a> {
        Windows {
            currents,
            window_size: self.window_size,
            step: self.step,
            next_start: 0,
            index: 0,
        }
    }

    /// The whole signal as a single window
    pub fn whole(currents: &PhaseCurrents) -> Window<'_> {
        Window {
            index: 0,
            start: 0,
            end: currents.len(),
            r: &currents.r,
            s: &currents.s,
            t: &currents.t,
        }
    }
}

/// Finite iterator over the windows of one signal
pub struct Windows<'a> {
    currents: &'a PhaseCurrents,
    window_size: usize,
    step: usize,
    next_start: usize,
    index: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start;
        let end = start.checked_add(self.window_size)?;
        if end > self.currents.len() {
            return None;
        }

        let window = Window {
            index: self.index,
            start,
            end,
            r: &self.currents.r[start..end],
            s: &self.currents.s[start..end],
            t: &self.currents.t[start..end],
        };
        self.next_start += self.step;
        self.index += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.currents.len();
        let remaining = if self.next_start + self.window_size > len {
            0
        } else {
            (len - self.next_start - self.window_size) / self.step + 1
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signal(n: usize) -> PhaseCurrents {
        let r: Vec<f64> = (0..n).map(|i| i as f64).collect();
        PhaseCurrents::new(r.clone(), r.clone(), r).unwrap()
    }

    #[test]
    fn test_offsets_and_indices() {
        let segmenter = WindowSegmenter::new(&WindowingConfig::new(4, 0.5)).unwrap();
        let data = signal(11);
        let windows: Vec<_> = segmenter.segment(&data).collect();

        let bounds: Vec<_> = windows.iter().map(|w| (w.index, w.start, w.end)).collect();
        assert_eq!(bounds, vec![(0, 0, 4), (1, 2, 6), (2, 4, 8), (3, 6, 10)]);
        assert_eq!(windows[1].r, &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_short_signal_yields_nothing() {
        let segmenter = WindowSegmenter::new(&WindowingConfig::new(8, 0.0)).unwrap();
        assert_eq!(segmenter.segment(&signal(7)).count(), 0);
    }

    #[test]
    fn test_whole_window() {
        let data = signal(5);
        let window = WindowSegmenter::whole(&data);
        assert_eq!((window.start, window.end, window.len()), (0, 5, 5));
    }

    #[test]
    fn test_zero_step_is_config_error() {
        assert!(WindowSegmenter::new(&WindowingConfig::new(2, 0.75)).is_err());
    }

    proptest! {
        #[test]
        fn window_count_matches_formula(
            window_size in 1usize..64,
            overlap in 0.0f64..0.9,
            n in 0usize..512,
        ) {
            let config = WindowingConfig::new(window_size, overlap);
            if let Ok(segmenter) = WindowSegmenter::new(&config) {
                let step = segmenter.step();
                let data = signal(n);
                let expected = if n >= window_size { (n - window_size) / step + 1 } else { 0 };
                let windows = segmenter.segment(&data);
                prop_assert_eq!(windows.len(), expected);
                prop_assert_eq!(windows.count(), expected);
            }
        }
    }
}
