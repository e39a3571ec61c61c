use serde::{Deserialize, Serialize};

/// How a window's RSI series is reduced to the single value a strategy
/// compares across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RsiSmoothing {
    /// Last defined value in the window.
    #[default]
    Last,
    /// Arithmetic mean of every defined value in the window.
    Mean,
    /// Exponential moving average (span `n`, alpha = 2/(n+1)) over the
    /// defined values, taking the final point.
    Ema {
        #[serde(default = "default_ema_span")]
        span: usize,
    },
}

fn default_ema_span() -> usize {
    5
}

/// RSI (Relative Strength Index) indicator.
///
/// Average gain and average loss are simple rolling means over `period`
/// close-to-close deltas, not Wilder's recursive smoothing. The series is
/// aligned with the input; the first `period` entries are undefined (NaN).
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
}

impl RsiIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "RSI period must be >= 2");
        Self { period }
    }

    /// Full RSI series for `closes` (oldest first). Undefined points are NaN.
    pub fn series(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let mut out = vec![f64::NAN; n];
        if n < self.period + 1 {
            return out;
        }

        let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let p = self.period as f64;

        for (i, window) in deltas.windows(self.period).enumerate() {
            let gain = window.iter().filter(|&&d| d > 0.0).sum::<f64>() / p;
            let loss = window.iter().filter(|&&d| d < 0.0).map(|d| -d).sum::<f64>() / p;
            // delta window [i, i+period) ends at close index i + period
            out[i + self.period] = rsi_from_averages(gain, loss);
        }
        out
    }

    /// Reduce the window's RSI series to one value. `None` when the window
    /// holds no defined RSI point.
    pub fn compute(&self, closes: &[f64], smoothing: RsiSmoothing) -> Option<f64> {
        let series = self.series(closes);
        let defined = series.iter().copied().filter(|v| v.is_finite());
        match smoothing {
            RsiSmoothing::Last => last_defined(&series),
            RsiSmoothing::Mean => {
                let (sum, count) = defined.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                (count > 0).then(|| sum / count as f64)
            }
            RsiSmoothing::Ema { span } => {
                let alpha = 2.0 / (span.max(1) as f64 + 1.0);
                defined.fold(None, |acc: Option<f64>, v| {
                    Some(match acc {
                        None => v,
                        Some(prev) => alpha * v + (1.0 - alpha) * prev,
                    })
                })
            }
        }
    }
}

fn last_defined(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // flat window: no gains and no losses, RSI is undefined
        if avg_gain == 0.0 {
            return f64::NAN;
        }
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_returns_none_when_insufficient_data() {
        let rsi = RsiIndicator::new(14);
        // Need at least period+1 = 15 values
        let prices: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert!(rsi.compute(&prices, RsiSmoothing::Last).is_none());
    }

    #[test]
    fn rsi_returns_some_with_exactly_period_plus_one() {
        let rsi = RsiIndicator::new(14);
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert!(rsi.compute(&prices, RsiSmoothing::Last).is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let value = rsi.compute(&prices, RsiSmoothing::Last).unwrap();
        assert!((value - 100.0).abs() < 1e-9, "Expected 100, got {value}");
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![14.0, 13.0, 12.0, 11.0, 10.0];
        let value = rsi.compute(&prices, RsiSmoothing::Last).unwrap();
        assert!(value.abs() < 1e-9, "Expected 0, got {value}");
    }

    #[test]
    fn rsi_flat_window_is_undefined() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![10.0; 6];
        assert!(rsi.compute(&prices, RsiSmoothing::Last).is_none());
        assert!(rsi.compute(&prices, RsiSmoothing::Mean).is_none());
    }

    #[test]
    fn rsi_uses_simple_rolling_means() {
        // deltas +2, -1 → avg gain 1.0, avg loss 0.5 → RS 2 → RSI 66.67
        let rsi = RsiIndicator::new(2);
        let value = rsi.compute(&[10.0, 12.0, 11.0], RsiSmoothing::Last).unwrap();
        assert!((value - 200.0 / 3.0).abs() < 1e-9, "got {value}");
    }

    #[test]
    fn series_is_aligned_with_leading_nans() {
        let rsi = RsiIndicator::new(2);
        let series = rsi.series(&[10.0, 12.0, 11.0, 13.0]);
        assert_eq!(series.len(), 4);
        assert!(series[0].is_nan() && series[1].is_nan());
        assert!(series[2].is_finite() && series[3].is_finite());
    }

    #[test]
    fn mean_averages_all_defined_points() {
        let rsi = RsiIndicator::new(2);
        let closes = [10.0, 12.0, 11.0, 13.0];
        let series = rsi.series(&closes);
        let expected = (series[2] + series[3]) / 2.0;
        let mean = rsi.compute(&closes, RsiSmoothing::Mean).unwrap();
        assert!((mean - expected).abs() < 1e-9);
    }

    #[test]
    fn ema_stays_within_series_range() {
        let rsi = RsiIndicator::new(2);
        let closes = [10.0, 12.0, 11.0, 13.0, 14.0, 12.5];
        let series: Vec<f64> = rsi.series(&closes).into_iter().filter(|v| v.is_finite()).collect();
        let ema = rsi.compute(&closes, RsiSmoothing::Ema { span: 3 }).unwrap();
        let lo = series.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = series.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(ema >= lo && ema <= hi, "ema {ema} outside [{lo}, {hi}]");
    }

    #[test]
    fn rsi_known_value_in_range() {
        let rsi = RsiIndicator::new(14);
        let prices = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.15, 43.61, 44.33, 44.83, 45.10,
            45.15, 44.34, 44.09,
        ];
        let v = rsi.compute(&prices, RsiSmoothing::Last).unwrap();
        assert!((0.0..=100.0).contains(&v), "RSI out of range: {v}");
    }
}
