use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::{OpenPosition, OrderSide};

use crate::evaluator::{level_cross, Cross};
use crate::indicators::IndicatorSnapshot;

fn default_upper_exit() -> f64 {
    70.0
}

fn default_lower_exit() -> f64 {
    30.0
}

/// `[exit]` table of the bot config.
///
/// ```toml
/// [exit]
/// rule = "aroon"
/// upper_exit = 70.0
/// lower_exit = 30.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ExitRule {
    /// Close longs once Aroon-up reaches `upper_exit`, shorts once
    /// Aroon-down drops to `lower_exit`.
    Aroon {
        #[serde(default = "default_upper_exit")]
        upper_exit: f64,
        #[serde(default = "default_lower_exit")]
        lower_exit: f64,
    },
    /// Close longs when RSI falls back through the upper band, shorts when
    /// it rises back through the lower band.
    Rsi,
}

/// Chooses which open positions to close this cycle.
#[derive(Debug, Clone)]
pub struct ExitPolicy {
    rule: ExitRule,
    rsi_lower: f64,
    rsi_upper: f64,
}

impl ExitPolicy {
    pub fn new(rule: ExitRule, rsi_lower: f64, rsi_upper: f64) -> Self {
        Self {
            rule,
            rsi_lower,
            rsi_upper,
        }
    }

    pub fn rule(&self) -> &ExitRule {
        &self.rule
    }

    /// Tickets to cancel. `prev_rsi` is the RSI stored before this cycle's
    /// evaluation overwrote the state.
    pub fn select(
        &self,
        positions: &[OpenPosition],
        instrument: &str,
        snapshot: &IndicatorSnapshot,
        prev_rsi: Option<f64>,
    ) -> Vec<u64> {
        let (close_buys, close_sells) = self.triggers(snapshot, prev_rsi);
        if !close_buys && !close_sells {
            return Vec::new();
        }

        let tickets: Vec<u64> = positions
            .iter()
            .filter(|p| p.instrument == instrument)
            .filter(|p| match p.side {
                OrderSide::Buy => close_buys,
                OrderSide::Sell => close_sells,
            })
            .map(|p| p.ticket)
            .collect();

        if !tickets.is_empty() {
            info!(instrument, rule = ?self.rule, ?tickets, "Exit condition met");
        }
        tickets
    }

    /// (close BUY positions, close SELL positions)
    fn triggers(&self, s: &IndicatorSnapshot, prev_rsi: Option<f64>) -> (bool, bool) {
        match self.rule {
            ExitRule::Aroon {
                upper_exit,
                lower_exit,
            } => {
                let buys = s.aroon_up.is_some_and(|up| up >= upper_exit);
                let sells = s.aroon_down.is_some_and(|down| down <= lower_exit);
                (buys, sells)
            }
            ExitRule::Rsi => {
                let (Some(prev), Some(cur)) = (prev_rsi, s.rsi) else {
                    debug!("No previous RSI, exit check skipped");
                    return (false, false);
                };
                let buys = level_cross(prev, cur, self.rsi_upper) == Some(Cross::Down);
                let sells = level_cross(prev, cur, self.rsi_lower) == Some(Cross::Up);
                (buys, sells)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(instrument: &str, ticket: u64, side: OrderSide) -> OpenPosition {
        OpenPosition {
            instrument: instrument.into(),
            ticket,
            side,
            volume: 0.1,
            open_price: 1900.0,
        }
    }

    fn aroon_policy() -> ExitPolicy {
        ExitPolicy::new(
            ExitRule::Aroon {
                upper_exit: 70.0,
                lower_exit: 30.0,
            },
            30.0,
            70.0,
        )
    }

    #[test]
    fn aroon_up_past_threshold_closes_only_longs() {
        let positions = vec![
            position("XAUUSD", 11, OrderSide::Buy),
            position("XAUUSD", 12, OrderSide::Sell),
        ];
        let snap = IndicatorSnapshot {
            aroon_up: Some(72.0),
            aroon_down: Some(44.0),
            ..Default::default()
        };
        assert_eq!(aroon_policy().select(&positions, "XAUUSD", &snap, None), vec![11]);
    }

    #[test]
    fn aroon_down_at_threshold_closes_shorts() {
        let positions = vec![
            position("XAUUSD", 11, OrderSide::Buy),
            position("XAUUSD", 12, OrderSide::Sell),
        ];
        let snap = IndicatorSnapshot {
            aroon_up: Some(55.0),
            aroon_down: Some(30.0),
            ..Default::default()
        };
        assert_eq!(aroon_policy().select(&positions, "XAUUSD", &snap, None), vec![12]);
    }

    #[test]
    fn other_instruments_are_ignored() {
        let positions = vec![
            position("EURUSD", 1, OrderSide::Buy),
            position("XAUUSD", 2, OrderSide::Buy),
        ];
        let snap = IndicatorSnapshot {
            aroon_up: Some(90.0),
            aroon_down: Some(50.0),
            ..Default::default()
        };
        assert_eq!(aroon_policy().select(&positions, "XAUUSD", &snap, None), vec![2]);
    }

    #[test]
    fn nothing_to_close_is_empty() {
        let snap = IndicatorSnapshot {
            aroon_up: Some(50.0),
            aroon_down: Some(50.0),
            ..Default::default()
        };
        let positions = vec![position("XAUUSD", 1, OrderSide::Buy)];
        assert!(aroon_policy().select(&positions, "XAUUSD", &snap, None).is_empty());
        assert!(aroon_policy().select(&[], "XAUUSD", &snap, None).is_empty());
    }

    #[test]
    fn undefined_aroon_closes_nothing() {
        let positions = vec![position("XAUUSD", 1, OrderSide::Buy)];
        let snap = IndicatorSnapshot::default();
        assert!(aroon_policy().select(&positions, "XAUUSD", &snap, None).is_empty());
    }

    #[test]
    fn rsi_exit_uses_previous_reading() {
        let policy = ExitPolicy::new(ExitRule::Rsi, 30.0, 70.0);
        let positions = vec![
            position("XAUUSD", 1, OrderSide::Buy),
            position("XAUUSD", 2, OrderSide::Sell),
        ];
        let falling = IndicatorSnapshot {
            rsi: Some(68.0),
            ..Default::default()
        };
        assert_eq!(policy.select(&positions, "XAUUSD", &falling, Some(72.0)), vec![1]);

        let rising = IndicatorSnapshot {
            rsi: Some(32.0),
            ..Default::default()
        };
        assert_eq!(policy.select(&positions, "XAUUSD", &rising, Some(28.0)), vec![2]);

        // without history there is no crossing to act on
        assert!(policy.select(&positions, "XAUUSD", &falling, None).is_empty());
    }

    #[test]
    fn exit_table_parses_with_defaults() {
        let rule: ExitRule = toml::from_str(r#"rule = "aroon""#).unwrap();
        assert_eq!(
            rule,
            ExitRule::Aroon {
                upper_exit: 70.0,
                lower_exit: 30.0
            }
        );
        let rule: ExitRule = toml::from_str(r#"rule = "rsi""#).unwrap();
        assert_eq!(rule, ExitRule::Rsi);
    }
}
