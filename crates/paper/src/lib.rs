use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{
    Bar, BrokerClient, Error, InstrumentMeta, OpenPosition, OrderReceipt, OrderRequest, Result,
    Tick, Timeframe,
};

/// Simulated broker that replays a recorded bar feed for one instrument.
///
/// Each `fetch_bars` call reveals one more bar of the feed and returns the
/// trailing `count` revealed bars, so successive polling cycles see the
/// market move forward. Once the feed is exhausted fetches return an empty
/// window. Quotes derive from the newest revealed close. No real orders are
/// ever sent anywhere.
pub struct PaperBroker {
    instrument: String,
    meta: InstrumentMeta,
    /// Ask = bid + spread_points * point.
    spread_points: f64,
    feed: Vec<Bar>,
    book: RwLock<Book>,
    fail_next_submit: AtomicBool,
}

#[derive(Default)]
struct Book {
    /// Number of feed bars revealed so far.
    cursor: usize,
    next_ticket: u64,
    positions: Vec<OpenPosition>,
    submitted: Vec<OrderRequest>,
    cancelled: Vec<u64>,
}

impl PaperBroker {
    pub fn new(
        instrument: impl Into<String>,
        meta: InstrumentMeta,
        spread_points: f64,
        feed: Vec<Bar>,
    ) -> Self {
        let instrument = instrument.into();
        info!(
            instrument = %instrument,
            bars = feed.len(),
            point = meta.point,
            spread_points,
            "PaperBroker initialized"
        );
        Self {
            instrument,
            meta,
            spread_points,
            feed,
            book: RwLock::new(Book {
                next_ticket: 1,
                ..Default::default()
            }),
            fail_next_submit: AtomicBool::new(false),
        }
    }

    /// Load the feed from a JSON array of bars.
    pub fn from_json_file(
        path: impl AsRef<Path>,
        instrument: impl Into<String>,
        meta: InstrumentMeta,
        spread_points: f64,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let feed: Vec<Bar> = serde_json::from_str(&content)?;
        Ok(Self::new(instrument, meta, spread_points, feed))
    }

    /// Treat the first `bars` feed entries as already-seen history, so the
    /// first fetch returns a full window.
    pub fn with_history(mut self, bars: usize) -> Self {
        self.book.get_mut().cursor = bars.min(self.feed.len());
        self
    }

    /// Make the next `submit_order` fail with a broker error.
    pub fn fail_next_submit(&self) {
        self.fail_next_submit.store(true, Ordering::SeqCst);
    }

    /// Tickets closed through `cancel_position`, in call order.
    pub async fn cancelled_tickets(&self) -> Vec<u64> {
        self.book.read().await.cancelled.clone()
    }

    /// Every order accepted so far, in submission order.
    pub async fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.book.read().await.submitted.clone()
    }

    /// Seed an already-open position (e.g. one opened before the bot started).
    pub async fn insert_position(&self, position: OpenPosition) {
        let mut book = self.book.write().await;
        book.next_ticket = book.next_ticket.max(position.ticket + 1);
        book.positions.push(position);
    }

    /// Feed bars not yet revealed by `fetch_bars`.
    pub async fn remaining_bars(&self) -> usize {
        self.feed.len() - self.book.read().await.cursor
    }

    fn check_instrument(&self, instrument: &str) -> Result<()> {
        if instrument == self.instrument {
            Ok(())
        } else {
            Err(Error::Broker(format!(
                "PaperBroker has no data for instrument '{instrument}' (serving '{}')",
                self.instrument
            )))
        }
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn fetch_bars(&self, instrument: &str, timeframe: Timeframe, count: usize) -> Result<Vec<Bar>> {
        self.check_instrument(instrument)?;
        let mut book = self.book.write().await;
        if book.cursor >= self.feed.len() {
            debug!(instrument, "Paper feed exhausted");
            return Ok(Vec::new());
        }
        book.cursor += 1;
        let end = book.cursor;
        let start = end.saturating_sub(count);
        debug!(instrument, %timeframe, start, end, "Paper bars served");
        Ok(self.feed[start..end].to_vec())
    }

    async fn current_tick(&self, instrument: &str) -> Result<Tick> {
        self.check_instrument(instrument)?;
        let cursor = self.book.read().await.cursor;
        let last = cursor
            .checked_sub(1)
            .and_then(|i| self.feed.get(i))
            .ok_or_else(|| Error::DataUnavailable(format!("no quote for {instrument} yet")))?;
        Ok(Tick {
            bid: last.close,
            ask: last.close + self.spread_points * self.meta.point,
            time: last.timestamp,
        })
    }

    async fn instrument_meta(&self, instrument: &str) -> Result<InstrumentMeta> {
        self.check_instrument(instrument)?;
        Ok(self.meta)
    }

    async fn open_positions(&self, instrument: &str) -> Result<Vec<OpenPosition>> {
        Ok(self
            .book
            .read()
            .await
            .positions
            .iter()
            .filter(|p| p.instrument == instrument)
            .cloned()
            .collect())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderReceipt> {
        if self.fail_next_submit.swap(false, Ordering::SeqCst) {
            warn!(order_id = %order.id, "Injected paper submit failure");
            return Err(Error::Broker("simulated order send failure".into()));
        }
        self.check_instrument(&order.instrument)?;
        if !(order.volume > 0.0) {
            return Err(Error::Broker(format!("invalid volume {}", order.volume)));
        }

        let mut book = self.book.write().await;
        let ticket = book.next_ticket;
        book.next_ticket += 1;
        book.positions.push(OpenPosition {
            instrument: order.instrument.clone(),
            ticket,
            side: order.side,
            volume: order.volume,
            open_price: order.entry_price,
        });
        book.submitted.push(order.clone());

        info!(
            ticket,
            instrument = %order.instrument,
            side = %order.side,
            price = order.entry_price,
            volume = order.volume,
            stop_loss = ?order.stop_loss,
            take_profit = ?order.take_profit,
            "Paper order filled"
        );

        Ok(OrderReceipt {
            ticket,
            instrument: order.instrument.clone(),
            side: order.side,
            price: order.entry_price,
            volume: order.volume,
            timestamp: Utc::now(),
        })
    }

    async fn cancel_position(&self, instrument: &str, ticket: u64) -> Result<()> {
        let mut book = self.book.write().await;
        let idx = book
            .positions
            .iter()
            .position(|p| p.ticket == ticket && p.instrument == instrument)
            .ok_or_else(|| Error::Broker(format!("unknown position ticket {ticket} on {instrument}")))?;
        let closed = book.positions.remove(idx);
        book.cancelled.push(ticket);
        info!(ticket, instrument, side = %closed.side, "Paper position closed");
        Ok(())
    }
}
