pub mod adx;
pub mod aroon;
pub mod rsi;

pub use adx::{AdxIndicator, DirectionalIndex};
pub use aroon::{AroonIndicator, AroonIter, AroonValue};
pub use rsi::{RsiIndicator, RsiSmoothing};

use common::Bar;

/// Indicator values computed from one bar window at one instant.
/// A field is `None` when the window is too short (or too flat) for it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub aroon_up: Option<f64>,
    pub aroon_down: Option<f64>,
}

/// Parameters for building an [`IndicatorSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSpec {
    pub rsi: RsiIndicator,
    pub rsi_smoothing: RsiSmoothing,
    pub adx: AdxIndicator,
    pub aroon: AroonIndicator,
}

impl SnapshotSpec {
    pub fn new(rsi_period: usize, rsi_smoothing: RsiSmoothing, adx_period: usize, aroon_period: usize) -> Self {
        Self {
            rsi: RsiIndicator::new(rsi_period),
            rsi_smoothing,
            adx: AdxIndicator::new(adx_period),
            aroon: AroonIndicator::new(aroon_period),
        }
    }

    pub fn compute(&self, bars: &[Bar]) -> IndicatorSnapshot {
        if bars.is_empty() {
            return IndicatorSnapshot::default();
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let di = self.adx.compute(bars);
        let aroon = self.aroon.last(bars);

        IndicatorSnapshot {
            rsi: self.rsi.compute(&closes, self.rsi_smoothing),
            adx: di.map(|d| d.adx),
            plus_di: di.map(|d| d.plus_di),
            minus_di: di.map(|d| d.minus_di),
            aroon_up: aroon.map(|a| a.up),
            aroon_down: aroon.map(|a| a.down),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};

    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_yields_empty_snapshot() {
        let spec = SnapshotSpec::new(14, RsiSmoothing::Last, 14, 25);
        assert_eq!(spec.compute(&[]), IndicatorSnapshot::default());
    }

    #[test]
    fn short_window_fills_only_what_it_can() {
        // 4 bars: enough for RSI(3), not for ADX(3) (needs 6) or Aroon(5)
        let bars = test_bars(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 12.0, 9.5, 11.0),
            (11.0, 12.5, 10.0, 10.5),
            (10.5, 13.0, 10.0, 12.0),
        ]);
        let snap = SnapshotSpec::new(3, RsiSmoothing::Last, 3, 5).compute(&bars);
        assert!(snap.rsi.is_some());
        assert!(snap.adx.is_none() && snap.plus_di.is_none());
        assert!(snap.aroon_up.is_none() && snap.aroon_down.is_none());
    }
}
