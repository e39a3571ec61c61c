//! Aroon: position of the window extreme as a percentage of the period.
//!
//! For each trailing window of `period` bars:
//!   up   = argmax(high) / period * 100
//!   down = argmin(low)  / period * 100
//! where the arg is the offset inside the window (0 = oldest bar) and ties
//! resolve to the earliest offset. An extreme on the newest bar therefore
//! reads `(period - 1) / period * 100`, never a full 100.

use common::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AroonValue {
    pub up: f64,
    pub down: f64,
}

#[derive(Debug, Clone)]
pub struct AroonIndicator {
    pub period: usize,
}

impl AroonIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Aroon period must be >= 1");
        Self { period }
    }

    /// Lazy Aroon sequence aligned with `bars`. The first `period - 1`
    /// items are `None`.
    pub fn iter<'a>(&self, bars: &'a [Bar]) -> AroonIter<'a> {
        AroonIter {
            bars,
            period: self.period,
            pos: 0,
        }
    }

    /// Aroon at the last bar, if the window is long enough.
    pub fn last(&self, bars: &[Bar]) -> Option<AroonValue> {
        if bars.len() < self.period {
            return None;
        }
        Some(aroon_at(bars, self.period, bars.len() - 1))
    }
}

pub struct AroonIter<'a> {
    bars: &'a [Bar],
    period: usize,
    pos: usize,
}

impl Iterator for AroonIter<'_> {
    type Item = Option<AroonValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bars.len() {
            return None;
        }
        let i = self.pos;
        self.pos += 1;
        if i + 1 < self.period {
            return Some(None);
        }
        Some(Some(aroon_at(self.bars, self.period, i)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bars.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AroonIter<'_> {}

fn aroon_at(bars: &[Bar], period: usize, end: usize) -> AroonValue {
    let window = &bars[end + 1 - period..=end];

    let mut max_offset = 0;
    let mut min_offset = 0;
    for (j, bar) in window.iter().enumerate() {
        // strict comparisons keep the earliest extreme on ties
        if bar.high > window[max_offset].high {
            max_offset = j;
        }
        if bar.low < window[min_offset].low {
            min_offset = j;
        }
    }

    let p = period as f64;
    AroonValue {
        up: max_offset as f64 / p * 100.0,
        down: min_offset as f64 / p * 100.0,
    }
}
