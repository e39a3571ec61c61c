use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{InstrumentMeta, OrderRequest, OrderSide, RejectionReason, Tick};

/// Per-instrument order sizing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Order volume in lots.
    pub lot_size: f64,
    /// Stop distance from entry, in pips.
    pub stop_loss_pips: f64,
    /// Target distance from entry, in pips.
    pub take_profit_pips: f64,
    /// Pip → price scale on top of the instrument point (100 for metals and
    /// crypto quoted with finer points).
    pub price_multiplier: f64,
    /// When false, orders go out without SL/TP.
    pub attach_stops: bool,
    pub magic: u64,
    pub comment: String,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            lot_size: 0.1,
            stop_loss_pips: 50.0,
            take_profit_pips: 25.0,
            price_multiplier: 1.0,
            attach_stops: true,
            magic: 123456,
            comment: "RSI Trading Bot".to_string(),
        }
    }
}

/// Turns a signal direction and a live quote into a market order with
/// stop-loss and take-profit levels.
///
/// BUY enters at the bid, SELL at the ask. Offsets are
/// `pips * point * price_multiplier` and are mirrored around the entry.
#[derive(Debug, Clone)]
pub struct OrderSizer {
    config: SizingConfig,
}

impl OrderSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    pub fn build(
        &self,
        instrument: &str,
        side: OrderSide,
        tick: &Tick,
        meta: &InstrumentMeta,
    ) -> Result<OrderRequest, RejectionReason> {
        self.check_preconditions(tick, meta)?;
        let cfg = &self.config;

        let entry = match side {
            OrderSide::Buy => tick.bid,
            OrderSide::Sell => tick.ask,
        };

        let (stop_loss, take_profit) = if cfg.attach_stops {
            let (sl, tp) = self.stop_levels(side, entry, meta.point);
            let (sl, tp) = (round_to_digits(sl, meta.digits), round_to_digits(tp, meta.digits));
            let quoted_entry = round_to_digits(entry, meta.digits);
            if sl == quoted_entry || tp == quoted_entry {
                return Err(RejectionReason::StopsAtEntry);
            }
            (Some(sl), Some(tp))
        } else {
            (None, None)
        };

        debug!(
            instrument,
            side = %side,
            entry,
            ?stop_loss,
            ?take_profit,
            volume = cfg.lot_size,
            "Order sized"
        );

        Ok(OrderRequest::market(
            instrument,
            side,
            cfg.lot_size,
            entry,
            stop_loss,
            take_profit,
            cfg.magic,
            cfg.comment.clone(),
        ))
    }

    /// Raw (stop-loss, take-profit) prices for an entry.
    pub fn stop_levels(&self, side: OrderSide, entry: f64, point: f64) -> (f64, f64) {
        let scale = point * self.config.price_multiplier;
        let sl_offset = self.config.stop_loss_pips * scale;
        let tp_offset = self.config.take_profit_pips * scale;
        match side {
            OrderSide::Buy => (entry - sl_offset, entry + tp_offset),
            OrderSide::Sell => (entry + sl_offset, entry - tp_offset),
        }
    }

    fn check_preconditions(&self, tick: &Tick, meta: &InstrumentMeta) -> Result<(), RejectionReason> {
        let cfg = &self.config;
        if !(cfg.lot_size > 0.0) {
            return Err(RejectionReason::NonPositiveLotSize);
        }
        if cfg.attach_stops && !(cfg.stop_loss_pips > 0.0 && cfg.take_profit_pips > 0.0) {
            return Err(RejectionReason::NonPositiveMargin);
        }
        if !(meta.point > 0.0) {
            return Err(RejectionReason::NonPositivePoint);
        }
        if !(cfg.price_multiplier > 0.0) {
            return Err(RejectionReason::NonPositiveMultiplier);
        }
        let quote_ok = |v: f64| v.is_finite() && v > 0.0;
        if !quote_ok(tick.bid) || !quote_ok(tick.ask) {
            return Err(RejectionReason::InvalidQuote);
        }
        Ok(())
    }
}

/// Largest precision an f64 price carries meaningfully.
const MAX_DIGITS: u32 = 15;

/// Round a price to the instrument's quoted precision, capped at
/// [`MAX_DIGITS`].
fn round_to_digits(price: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits.min(MAX_DIGITS) as i32);
    (price * scale).round() / scale
}
