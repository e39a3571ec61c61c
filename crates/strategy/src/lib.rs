pub mod config;
pub mod evaluator;
pub mod exit;
pub mod indicators;

pub use config::BotConfig;
pub use evaluator::{
    level_cross, line_cross, AroonBands, Cross, Evaluator, EvaluatorParams, EvaluatorState,
    Polarity, Reading, StrategyKind,
};
pub use exit::{ExitPolicy, ExitRule};
pub use indicators::{IndicatorSnapshot, RsiSmoothing, SnapshotSpec};

impl Evaluator {
    /// Evaluator for the `[strategy]` table of a loaded config.
    pub fn from_config(cfg: &BotConfig) -> Self {
        Evaluator::new(cfg.strategy.clone(), cfg.evaluator_params())
    }
}

impl ExitPolicy {
    /// Exit policy for the `[exit]` table, if one is configured.
    pub fn from_config(cfg: &BotConfig) -> Option<Self> {
        cfg.exit
            .clone()
            .map(|rule| ExitPolicy::new(rule, cfg.rsi_lower, cfg.rsi_upper))
    }
}
