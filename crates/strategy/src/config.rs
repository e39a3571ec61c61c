use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, Result, Timeframe};

use crate::evaluator::{EvaluatorParams, StrategyKind};
use crate::exit::ExitRule;
use crate::indicators::RsiSmoothing;

/// Bot config file (TOML).
///
/// Example `config/bot.toml`:
/// ```toml
/// symbol = "XAUUSD"
/// lot_size = 0.1
/// sleep_interval_seconds = 60
/// rsi_period = 14
/// rsi_upper = 70.0
/// rsi_lower = 30.0
/// adx_threshold = 35.0
/// stop_loss_pips = 50.0
/// take_profit_pips = 25.0
/// aroon_window = 25
///
/// [strategy]
/// kind = "rsi"
/// smoothing = { mode = "mean" }
///
/// [exit]
/// rule = "aroon"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub symbol: String,
    pub lot_size: f64,
    pub sleep_interval_seconds: u64,
    #[serde(default)]
    pub timeframe: Timeframe,

    pub rsi_period: usize,
    pub rsi_upper: f64,
    pub rsi_lower: f64,
    #[serde(default = "default_adx_period")]
    pub adx_period: usize,
    pub adx_threshold: f64,
    pub aroon_window: usize,
    /// Bars fetched per cycle. Defaults per strategy kind.
    #[serde(default)]
    pub window_bars: Option<usize>,

    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    /// Scales pip offsets for instruments quoted with finer points.
    #[serde(default = "default_price_multiplier")]
    pub price_multiplier: f64,
    /// Send SL/TP with the order.
    #[serde(default = "default_true")]
    pub attach_stops: bool,
    /// Close open positions on the instrument before entering on a new signal.
    #[serde(default)]
    pub close_open_on_signal: bool,
    #[serde(default = "default_magic")]
    pub magic: u64,
    #[serde(default = "default_comment")]
    pub comment: String,

    #[serde(default = "default_strategy")]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub exit: Option<ExitRule>,
}

fn default_adx_period() -> usize {
    14
}

fn default_price_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_magic() -> u64 {
    123456
}

fn default_comment() -> String {
    "RSI Trading Bot".to_string()
}

fn default_strategy() -> StrategyKind {
    StrategyKind::Rsi {
        smoothing: RsiSmoothing::Last,
        polarity: Default::default(),
    }
}

impl BotConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read bot config at '{path}': {e}")))?;
        let cfg = Self::from_toml(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{path}: {msg}")),
            other => other,
        })?;
        info!(
            path,
            symbol = %cfg.symbol,
            strategy = %cfg.strategy,
            timeframe = %cfg.timeframe,
            "Bot config loaded"
        );
        Ok(cfg)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("invalid bot config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        fn reject(msg: impl Into<String>) -> Result<()> {
            Err(Error::Config(msg.into()))
        }

        if self.symbol.trim().is_empty() {
            return reject("symbol must not be empty");
        }
        if !(self.lot_size > 0.0) {
            return reject(format!("lot_size must be > 0, got {}", self.lot_size));
        }
        if self.sleep_interval_seconds == 0 {
            return reject("sleep_interval_seconds must be >= 1");
        }
        if self.rsi_period < 2 {
            return reject(format!("rsi_period must be >= 2, got {}", self.rsi_period));
        }
        if !(0.0..=100.0).contains(&self.rsi_lower)
            || !(0.0..=100.0).contains(&self.rsi_upper)
            || self.rsi_lower >= self.rsi_upper
        {
            return reject(format!(
                "RSI bands must satisfy 0 <= lower < upper <= 100, got {} / {}",
                self.rsi_lower, self.rsi_upper
            ));
        }
        if self.adx_period == 0 {
            return reject("adx_period must be >= 1");
        }
        if !(0.0..=100.0).contains(&self.adx_threshold) {
            return reject(format!("adx_threshold must be within [0, 100], got {}", self.adx_threshold));
        }
        if self.aroon_window < 2 {
            return reject(format!("aroon_window must be >= 2, got {}", self.aroon_window));
        }
        if !(self.stop_loss_pips > 0.0) || !(self.take_profit_pips > 0.0) {
            return reject("stop_loss_pips and take_profit_pips must be > 0");
        }
        if !(self.price_multiplier > 0.0) {
            return reject(format!("price_multiplier must be > 0, got {}", self.price_multiplier));
        }
        if self.window_bars == Some(0) {
            return reject("window_bars must be >= 1 when set");
        }

        match &self.strategy {
            StrategyKind::Rsi {
                smoothing: RsiSmoothing::Ema { span },
                ..
            } if *span == 0 => return reject("EMA span must be >= 1"),
            StrategyKind::Aroon {
                entry_bands: Some(bands),
            } if !(0.0 <= bands.lower && bands.lower <= bands.upper && bands.upper <= 100.0) => {
                return reject(format!(
                    "Aroon entry bands must satisfy 0 <= lower <= upper <= 100, got {} / {}",
                    bands.lower, bands.upper
                ));
            }
            _ => {}
        }

        if let Some(ExitRule::Aroon {
            upper_exit,
            lower_exit,
        }) = &self.exit
        {
            if !(0.0..=100.0).contains(upper_exit) || !(0.0..=100.0).contains(lower_exit) {
                return reject("Aroon exit thresholds must be within [0, 100]");
            }
        }
        // Only the RSI-tracking kinds store a previous RSI for the exit crossing.
        if matches!(self.exit, Some(ExitRule::Rsi))
            && !matches!(self.strategy, StrategyKind::Rsi { .. } | StrategyKind::AdxRsi)
        {
            return reject(format!(
                "exit rule \"rsi\" needs an RSI-tracking strategy (rsi or adx_rsi), got {}",
                self.strategy
            ));
        }
        Ok(())
    }

    pub fn evaluator_params(&self) -> EvaluatorParams {
        EvaluatorParams {
            rsi_period: self.rsi_period,
            rsi_upper: self.rsi_upper,
            rsi_lower: self.rsi_lower,
            adx_period: self.adx_period,
            adx_threshold: self.adx_threshold,
            aroon_window: self.aroon_window,
            window_bars: self.window_bars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{AroonBands, Polarity};

    const BASE: &str = r#"
symbol = "XAUUSD"
lot_size = 0.1
sleep_interval_seconds = 60
rsi_period = 14
rsi_upper = 70.0
rsi_lower = 30.0
adx_threshold = 35.0
stop_loss_pips = 50.0
take_profit_pips = 25.0
aroon_window = 25
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = BotConfig::from_toml(BASE).unwrap();
        assert_eq!(cfg.timeframe, Timeframe::M1);
        assert_eq!(cfg.adx_period, 14);
        assert_eq!(cfg.price_multiplier, 1.0);
        assert!(cfg.attach_stops);
        assert!(!cfg.close_open_on_signal);
        assert_eq!(cfg.magic, 123456);
        assert_eq!(cfg.comment, "RSI Trading Bot");
        assert_eq!(cfg.strategy, default_strategy());
        assert!(cfg.exit.is_none());
    }

    #[test]
    fn strategy_and_exit_tables_parse() {
        let text = format!(
            "{BASE}\ntimeframe = \"H1\"\n\n[strategy]\nkind = \"aroon\"\nentry_bands = {{ lower = 30.0, upper = 70.0 }}\n\n[exit]\nrule = \"aroon\"\nupper_exit = 75.0\n"
        );
        let cfg = BotConfig::from_toml(&text).unwrap();
        assert_eq!(cfg.timeframe, Timeframe::H1);
        assert_eq!(
            cfg.strategy,
            StrategyKind::Aroon {
                entry_bands: Some(AroonBands { lower: 30.0, upper: 70.0 })
            }
        );
        assert_eq!(
            cfg.exit,
            Some(ExitRule::Aroon {
                upper_exit: 75.0,
                lower_exit: 30.0
            })
        );
    }

    #[test]
    fn rsi_variants_parse() {
        let text = format!(
            "{BASE}\n[strategy]\nkind = \"rsi\"\npolarity = \"momentum\"\nsmoothing = {{ mode = \"ema\" }}\n"
        );
        let cfg = BotConfig::from_toml(&text).unwrap();
        assert_eq!(
            cfg.strategy,
            StrategyKind::Rsi {
                smoothing: RsiSmoothing::Ema { span: 5 },
                polarity: Polarity::Momentum
            }
        );
    }

    #[test]
    fn inverted_bands_are_rejected() {
        let text = BASE.replace("rsi_lower = 30.0", "rsi_lower = 75.0");
        assert!(matches!(BotConfig::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    fn zero_lot_size_is_rejected() {
        let text = BASE.replace("lot_size = 0.1", "lot_size = 0.0");
        assert!(matches!(BotConfig::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    fn short_rsi_period_is_rejected() {
        let text = BASE.replace("rsi_period = 14", "rsi_period = 1");
        assert!(matches!(BotConfig::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    fn missing_field_is_a_config_error() {
        let text = BASE.replace("symbol = \"XAUUSD\"", "");
        assert!(matches!(BotConfig::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let text = format!("{BASE}\n[strategy]\nkind = \"macd\"\n");
        assert!(BotConfig::from_toml(&text).is_err());
    }

    #[test]
    fn rsi_exit_needs_rsi_tracking_strategy() {
        for kind in ["aroon", "dxi"] {
            let text = format!("{BASE}\n[strategy]\nkind = \"{kind}\"\n\n[exit]\nrule = \"rsi\"\n");
            assert!(matches!(BotConfig::from_toml(&text), Err(Error::Config(_))), "{kind}");
        }
        for kind in ["rsi", "adx_rsi"] {
            let text = format!("{BASE}\n[strategy]\nkind = \"{kind}\"\n\n[exit]\nrule = \"rsi\"\n");
            let cfg = BotConfig::from_toml(&text).unwrap();
            assert_eq!(cfg.exit, Some(ExitRule::Rsi));
        }
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = BotConfig::load("/nonexistent/bot.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
