use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::{Bar, Error, Result, Signal};

use crate::indicators::{IndicatorSnapshot, RsiSmoothing, SnapshotSpec};

/// Bars fetched per cycle by the ADX / DI / Aroon kinds unless overridden.
pub const DEFAULT_WIDE_WINDOW: usize = 100;

/// Which side of the RSI bands a strategy trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// SELL when RSI drops back under the upper band, BUY when it climbs
    /// back over the lower band.
    #[default]
    Reversion,
    /// BUY on a break up through the upper band, SELL on a break down
    /// through the lower band.
    Momentum,
}

/// Inclusive band the previous Aroon pair must sit in for a crossover to count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AroonBands {
    pub lower: f64,
    pub upper: f64,
}

impl AroonBands {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Strategy family selected in the `[strategy]` table of the bot config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    /// RSI band crossing. Covers the plain, mean, EMA and inverse variants.
    Rsi {
        #[serde(default)]
        smoothing: RsiSmoothing,
        #[serde(default)]
        polarity: Polarity,
    },
    /// RSI band crossing, only while ADX is strong and DI agrees.
    AdxRsi,
    /// +DI / -DI line crossover, gated by ADX.
    Dxi,
    /// Aroon up / down crossover, optionally band-gated on the previous pair.
    Aroon {
        #[serde(default)]
        entry_bands: Option<AroonBands>,
    },
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Rsi { smoothing, polarity } => {
                let prefix = match polarity {
                    Polarity::Reversion => "rsi",
                    Polarity::Momentum => "inverse_rsi",
                };
                match smoothing {
                    RsiSmoothing::Last => write!(f, "{prefix}"),
                    RsiSmoothing::Mean => write!(f, "{prefix}_mean"),
                    RsiSmoothing::Ema { span } => write!(f, "{prefix}_ema{span}"),
                }
            }
            StrategyKind::AdxRsi => write!(f, "adx_rsi"),
            StrategyKind::Dxi => write!(f, "dxi"),
            StrategyKind::Aroon { entry_bands: None } => write!(f, "aroon"),
            StrategyKind::Aroon { entry_bands: Some(_) } => write!(f, "aroon_bands"),
        }
    }
}

// ─── State ────────────────────────────────────────────────────────────────────

/// The indicator value(s) an evaluator carries from one cycle to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Rsi(f64),
    Directional { plus_di: f64, minus_di: f64 },
    Aroon { up: f64, down: f64 },
}

impl Reading {
    pub fn label(&self) -> &'static str {
        match self {
            Reading::Rsi(_) => "rsi",
            Reading::Directional { .. } => "directional",
            Reading::Aroon { .. } => "aroon",
        }
    }
}

/// Cross-cycle memory of one (instrument, strategy) loop.
///
/// Starts `Unprimed`. The first defined reading primes it without trading;
/// every later evaluation overwrites it, whether or not a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EvaluatorState {
    #[default]
    Unprimed,
    Primed(Reading),
}

impl EvaluatorState {
    pub fn is_primed(&self) -> bool {
        matches!(self, EvaluatorState::Primed(_))
    }

    pub fn reading(&self) -> Option<Reading> {
        match self {
            EvaluatorState::Primed(r) => Some(*r),
            EvaluatorState::Unprimed => None,
        }
    }

    /// Previous RSI, when this state belongs to an RSI-tracking strategy.
    pub fn rsi(&self) -> Option<f64> {
        match self {
            EvaluatorState::Primed(Reading::Rsi(v)) => Some(*v),
            _ => None,
        }
    }
}

// ─── Crossing detection ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    Up,
    Down,
}

/// A value moving strictly from one side of `level` to the other.
pub fn level_cross(prev: f64, cur: f64, level: f64) -> Option<Cross> {
    if prev < level && cur > level {
        Some(Cross::Up)
    } else if prev > level && cur < level {
        Some(Cross::Down)
    } else {
        None
    }
}

/// Line A crossing line B between two observations.
pub fn line_cross(prev_a: f64, prev_b: f64, cur_a: f64, cur_b: f64) -> Option<Cross> {
    if prev_a < prev_b && cur_a > cur_b {
        Some(Cross::Up)
    } else if prev_a > prev_b && cur_a < cur_b {
        Some(Cross::Down)
    } else {
        None
    }
}

/// RSI band rule shared by every RSI-driven kind. The upper band is checked
/// first; bands are validated `lower < upper` so both cannot fire at once.
pub fn rsi_band_signal(prev: f64, cur: f64, lower: f64, upper: f64, polarity: Polarity) -> Signal {
    match polarity {
        Polarity::Reversion => {
            if level_cross(prev, cur, upper) == Some(Cross::Down) {
                Signal::Sell
            } else if level_cross(prev, cur, lower) == Some(Cross::Up) {
                Signal::Buy
            } else {
                Signal::None
            }
        }
        Polarity::Momentum => {
            if level_cross(prev, cur, upper) == Some(Cross::Up) {
                Signal::Buy
            } else if level_cross(prev, cur, lower) == Some(Cross::Down) {
                Signal::Sell
            } else {
                Signal::None
            }
        }
    }
}

// ─── Evaluator ────────────────────────────────────────────────────────────────

/// Numeric parameters shared by every strategy kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorParams {
    pub rsi_period: usize,
    pub rsi_upper: f64,
    pub rsi_lower: f64,
    pub adx_period: usize,
    pub adx_threshold: f64,
    pub aroon_window: usize,
    /// Overrides the per-kind default fetch size.
    pub window_bars: Option<usize>,
}

impl Default for EvaluatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_upper: 70.0,
            rsi_lower: 30.0,
            adx_period: 14,
            adx_threshold: 35.0,
            aroon_window: 25,
            window_bars: None,
        }
    }
}

/// Turns a bar window plus the previous reading into a signal.
///
/// `evaluate` is a pure function of its inputs: the same window and state
/// always give the same `(state, signal)`.
#[derive(Debug, Clone)]
pub struct Evaluator {
    kind: StrategyKind,
    params: EvaluatorParams,
    spec: SnapshotSpec,
}

impl Evaluator {
    pub fn new(kind: StrategyKind, params: EvaluatorParams) -> Self {
        let smoothing = match &kind {
            StrategyKind::Rsi { smoothing, .. } => *smoothing,
            _ => RsiSmoothing::Last,
        };
        let spec = SnapshotSpec::new(
            params.rsi_period,
            smoothing,
            params.adx_period,
            params.aroon_window,
        );
        Self { kind, params, spec }
    }

    pub fn kind(&self) -> &StrategyKind {
        &self.kind
    }

    pub fn params(&self) -> &EvaluatorParams {
        &self.params
    }

    /// Fewest bars that can yield a defined reading for this kind.
    pub fn min_bars(&self) -> usize {
        let p = &self.params;
        match self.kind {
            StrategyKind::Rsi { .. } => p.rsi_period + 1,
            StrategyKind::AdxRsi => (p.rsi_period + 1).max(2 * p.adx_period),
            StrategyKind::Dxi => 2 * p.adx_period,
            StrategyKind::Aroon { .. } => p.aroon_window,
        }
    }

    /// How many bars to fetch each cycle.
    pub fn required_bars(&self) -> usize {
        let default = match self.kind {
            StrategyKind::Rsi { .. } => self.params.rsi_period + 1,
            _ => DEFAULT_WIDE_WINDOW,
        };
        self.params.window_bars.unwrap_or(default).max(self.min_bars())
    }

    pub fn snapshot(&self, window: &[Bar]) -> IndicatorSnapshot {
        self.spec.compute(window)
    }

    /// Evaluate one window. An empty or too-short window returns the state
    /// unchanged with `Signal::None`.
    pub fn evaluate(&self, window: &[Bar], state: &EvaluatorState) -> Result<(EvaluatorState, Signal)> {
        if window.is_empty() {
            debug!(strategy = %self.kind, "Empty bar window, keeping previous state");
            return Ok((*state, Signal::None));
        }
        let snapshot = self.snapshot(window);
        self.evaluate_snapshot(&snapshot, state)
    }

    pub fn evaluate_snapshot(
        &self,
        snapshot: &IndicatorSnapshot,
        state: &EvaluatorState,
    ) -> Result<(EvaluatorState, Signal)> {
        let Some(current) = self.reading(snapshot) else {
            debug!(strategy = %self.kind, ?snapshot, "Indicators undefined for window, keeping previous state");
            return Ok((*state, Signal::None));
        };

        let previous = match state {
            EvaluatorState::Unprimed => {
                debug!(strategy = %self.kind, ?current, "Priming evaluator state");
                return Ok((EvaluatorState::Primed(current), Signal::None));
            }
            EvaluatorState::Primed(prev) => *prev,
        };

        if std::mem::discriminant(&previous) != std::mem::discriminant(&current) {
            return Err(Error::StateMismatch {
                expected: current.label(),
                found: previous.label(),
            });
        }

        let signal = self.decide(previous, current, snapshot);
        if signal.is_none() {
            debug!(strategy = %self.kind, ?previous, ?current, "No signal");
        } else {
            info!(strategy = %self.kind, ?previous, ?current, signal = %signal, "Signal generated");
        }
        Ok((EvaluatorState::Primed(current), signal))
    }

    /// The reading this kind tracks, if every indicator it needs is defined.
    fn reading(&self, s: &IndicatorSnapshot) -> Option<Reading> {
        match self.kind {
            StrategyKind::Rsi { .. } => s.rsi.map(Reading::Rsi),
            StrategyKind::AdxRsi => {
                // the gate needs ADX and DI even though only RSI is stored
                s.adx?;
                s.plus_di?;
                s.minus_di?;
                s.rsi.map(Reading::Rsi)
            }
            StrategyKind::Dxi => {
                s.adx?;
                Some(Reading::Directional {
                    plus_di: s.plus_di?,
                    minus_di: s.minus_di?,
                })
            }
            StrategyKind::Aroon { .. } => Some(Reading::Aroon {
                up: s.aroon_up?,
                down: s.aroon_down?,
            }),
        }
    }

    fn decide(&self, previous: Reading, current: Reading, s: &IndicatorSnapshot) -> Signal {
        let p = &self.params;
        match (&self.kind, previous, current) {
            (StrategyKind::Rsi { polarity, .. }, Reading::Rsi(prev), Reading::Rsi(cur)) => {
                rsi_band_signal(prev, cur, p.rsi_lower, p.rsi_upper, *polarity)
            }

            (StrategyKind::AdxRsi, Reading::Rsi(prev), Reading::Rsi(cur)) => {
                let (adx, plus_di, minus_di) = match (s.adx, s.plus_di, s.minus_di) {
                    (Some(a), Some(pl), Some(mi)) => (a, pl, mi),
                    _ => return Signal::None,
                };
                if adx < p.adx_threshold {
                    debug!(adx, threshold = p.adx_threshold, "ADX below threshold, RSI crossing ignored");
                    return Signal::None;
                }
                match rsi_band_signal(prev, cur, p.rsi_lower, p.rsi_upper, Polarity::Reversion) {
                    Signal::Buy if plus_di < minus_di => Signal::Buy,
                    Signal::Sell if plus_di > minus_di => Signal::Sell,
                    Signal::None => Signal::None,
                    rejected => {
                        info!(
                            adx,
                            plus_di,
                            minus_di,
                            signal = %rejected,
                            "RSI crossed but DI does not confirm, skipping"
                        );
                        Signal::None
                    }
                }
            }

            (
                StrategyKind::Dxi,
                Reading::Directional { plus_di: prev_plus, minus_di: prev_minus },
                Reading::Directional { plus_di, minus_di },
            ) => {
                let adx = s.adx.unwrap_or(0.0);
                if adx < p.adx_threshold {
                    debug!(adx, threshold = p.adx_threshold, plus_di, minus_di, "ADX below threshold");
                    return Signal::None;
                }
                match line_cross(prev_plus, prev_minus, plus_di, minus_di) {
                    Some(Cross::Up) => Signal::Buy,
                    Some(Cross::Down) => Signal::Sell,
                    None => Signal::None,
                }
            }

            (
                StrategyKind::Aroon { entry_bands },
                Reading::Aroon { up: prev_up, down: prev_down },
                Reading::Aroon { up, down },
            ) => {
                let Some(cross) = line_cross(prev_up, prev_down, up, down) else {
                    return Signal::None;
                };
                if let Some(bands) = entry_bands {
                    if !(bands.contains(prev_up) && bands.contains(prev_down)) {
                        debug!(prev_up, prev_down, ?bands, "Aroon crossover outside entry bands");
                        return Signal::None;
                    }
                }
                match cross {
                    Cross::Up => Signal::Buy,
                    Cross::Down => Signal::Sell,
                }
            }

            // readings are checked against the kind before `decide` runs
            _ => Signal::None,
        }
    }
}
