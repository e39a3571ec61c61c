use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC bar. Windows of bars are always ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Bar period requested from the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[default]
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        write!(f, "{s}")
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Decision emitted by an evaluator once per polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    None,
}

impl Signal {
    /// The order side this signal asks for, if any.
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Signal::Buy => Some(OrderSide::Buy),
            Signal::Sell => Some(OrderSide::Sell),
            Signal::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Signal::None)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::None => write!(f, "NONE"),
        }
    }
}

/// Current best quote for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
    pub time: DateTime<Utc>,
}

/// Static instrument properties needed for order sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMeta {
    /// Minimum quoted price increment.
    pub point: f64,
    pub digits: u32,
}

/// A position currently open at the broker. Fetched fresh every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub instrument: String,
    pub ticket: u64,
    pub side: OrderSide,
    pub volume: f64,
    pub open_price: f64,
}

/// A market order ready for submission. Built once per signal and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: String,
    pub instrument: String,
    pub volume: f64,
    pub side: OrderSide,
    pub entry_price: f64,
    /// `None` when the order is placed without protective levels.
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub magic: u64,
    pub comment: String,
}

impl OrderRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn market(
        instrument: impl Into<String>,
        side: OrderSide,
        volume: f64,
        entry_price: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
        magic: u64,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instrument: instrument.into(),
            volume,
            side,
            entry_price,
            stop_loss,
            take_profit,
            magic,
            comment: comment.into(),
        }
    }
}

/// Confirmation returned by the broker for an accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub ticket: u64,
    pub instrument: String,
    pub side: OrderSide,
    pub price: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// Reason an order was refused before it reached the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    NonPositiveLotSize,
    NonPositiveMargin,
    NonPositivePoint,
    NonPositiveMultiplier,
    InvalidQuote,
    /// Rounding to the instrument's digits put SL or TP on the entry price.
    StopsAtEntry,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::NonPositiveLotSize => write!(f, "lot size must be positive"),
            RejectionReason::NonPositiveMargin => write!(f, "stop/take margins must be positive"),
            RejectionReason::NonPositivePoint => write!(f, "instrument point must be positive"),
            RejectionReason::NonPositiveMultiplier => write!(f, "price multiplier must be positive"),
            RejectionReason::InvalidQuote => write!(f, "bid/ask quote is not a positive number"),
            RejectionReason::StopsAtEntry => write!(f, "stop levels round onto the entry price"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_maps_to_side() {
        assert_eq!(Signal::Buy.side(), Some(OrderSide::Buy));
        assert_eq!(Signal::Sell.side(), Some(OrderSide::Sell));
        assert_eq!(Signal::None.side(), None);
        assert!(Signal::default().is_none());
    }

    #[test]
    fn market_orders_get_unique_ids() {
        let a = OrderRequest::market("EURUSD", OrderSide::Buy, 0.1, 1.1, None, None, 1, "x");
        let b = OrderRequest::market("EURUSD", OrderSide::Buy, 0.1, 1.1, None, None, 1, "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn timeframe_round_trips_through_serde() {
        let tf: Timeframe = serde_json::from_str("\"H4\"").unwrap();
        assert_eq!(tf, Timeframe::H4);
        assert_eq!(tf.to_string(), "H4");
    }
}
