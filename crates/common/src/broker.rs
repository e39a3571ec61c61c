use async_trait::async_trait;

use crate::{Bar, InstrumentMeta, OpenPosition, OrderReceipt, OrderRequest, Result, Tick, Timeframe};

/// Abstraction over the broker / market-data terminal.
///
/// `PaperBroker` implements this for replay and simulation. A live terminal
/// bridge would implement the same six calls.
///
/// Only the engine's `OrderExecutor` submits or cancels through a
/// `dyn BrokerClient`; evaluators never see it.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Fetch the most recent `count` bars, oldest first. An empty vec means
    /// no data is available right now.
    async fn fetch_bars(&self, instrument: &str, timeframe: Timeframe, count: usize)
        -> Result<Vec<Bar>>;

    /// Latest bid/ask quote for the instrument.
    async fn current_tick(&self, instrument: &str) -> Result<Tick>;

    /// Static instrument properties (minimum price increment).
    async fn instrument_meta(&self, instrument: &str) -> Result<InstrumentMeta>;

    /// Positions currently open for the instrument.
    async fn open_positions(&self, instrument: &str) -> Result<Vec<OpenPosition>>;

    /// Submit an order and return the broker's receipt.
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderReceipt>;

    /// Close / remove the position identified by `ticket`.
    async fn cancel_position(&self, instrument: &str, ticket: u64) -> Result<()>;
}
