//! ADX: Average Directional Index with +DI / -DI (Wilder).
//!
//! 1. +DM, -DM and true range per bar transition
//! 2. Wilder-smoothed sums of each, seeded with the first `period` transitions
//! 3. ±DI = 100 * smoothed(±DM) / smoothed(TR)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = mean of the first `period` DX values, then Wilder-smoothed
//!
//! Needs `2 * period` bars for one ADX value.

use common::Bar;

/// Last-bar directional readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalIndex {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

#[derive(Debug, Clone)]
pub struct AdxIndicator {
    pub period: usize,
}

impl AdxIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self { period }
    }

    pub fn min_bars(&self) -> usize {
        2 * self.period
    }

    /// ADX, +DI and -DI at the last bar. `None` when the window is too short
    /// or the final smoothed true range is zero (no price movement). Steps
    /// where the running smoothed TR is zero read as DI (0, 0).
    pub fn compute(&self, bars: &[Bar]) -> Option<DirectionalIndex> {
        if bars.len() < self.min_bars() {
            return None;
        }
        let p = self.period;
        let pf = p as f64;

        let moves: Vec<(f64, f64, f64)> = bars
            .windows(2)
            .map(|w| directional_move(&w[0], &w[1]))
            .collect();

        let mut s_plus: f64 = moves[..p].iter().map(|m| m.0).sum();
        let mut s_minus: f64 = moves[..p].iter().map(|m| m.1).sum();
        let mut s_tr: f64 = moves[..p].iter().map(|m| m.2).sum();

        let mut di = di_pair(s_plus, s_minus, s_tr);
        let mut dx = Vec::with_capacity(moves.len() - p + 1);
        dx.push(dx_of(di));

        for &(plus_dm, minus_dm, tr) in &moves[p..] {
            s_plus = s_plus - s_plus / pf + plus_dm;
            s_minus = s_minus - s_minus / pf + minus_dm;
            s_tr = s_tr - s_tr / pf + tr;
            di = di_pair(s_plus, s_minus, s_tr);
            dx.push(dx_of(di));
        }

        if !(s_tr > 0.0 && s_tr.is_finite()) {
            return None;
        }

        let mut adx = dx[..p].iter().sum::<f64>() / pf;
        for &v in &dx[p..] {
            adx = (adx * (pf - 1.0) + v) / pf;
        }

        Some(DirectionalIndex {
            adx,
            plus_di: di.0,
            minus_di: di.1,
        })
    }
}

fn directional_move(prev: &Bar, cur: &Bar) -> (f64, f64, f64) {
    let up_move = cur.high - prev.high;
    let down_move = prev.low - cur.low;

    let plus_dm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
    let minus_dm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
    let tr = (cur.high - cur.low)
        .max((cur.high - prev.close).abs())
        .max((cur.low - prev.close).abs());

    (plus_dm, minus_dm, tr)
}

fn di_pair(s_plus: f64, s_minus: f64, s_tr: f64) -> (f64, f64) {
    if !(s_tr > 0.0 && s_tr.is_finite()) {
        return (0.0, 0.0);
    }
    (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
}

fn dx_of((plus_di, minus_di): (f64, f64)) -> f64 {
    let sum = plus_di + minus_di;
    if sum == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}
