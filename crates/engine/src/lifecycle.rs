use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use common::{Bar, BrokerClient, OrderReceipt, OrderSide, Result, Signal, Timeframe};
use risk::{OrderSizer, SizingConfig};
use strategy::{BotConfig, Evaluator, EvaluatorState, ExitPolicy, ExitRule, IndicatorSnapshot};

use crate::executor::OrderExecutor;

/// Outcome of one polling cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub signal: Signal,
    /// Bars in the fetched window (0 when data was unavailable).
    pub bars: usize,
    /// Tickets closed by the exit policy or by `close_open_on_signal`.
    pub closed: Vec<u64>,
    pub order: Option<OrderReceipt>,
}

impl CycleReport {
    fn idle() -> Self {
        Self {
            signal: Signal::None,
            bars: 0,
            closed: Vec::new(),
            order: None,
        }
    }
}

/// Polling loop for one (instrument, strategy) pair.
///
/// Owns the evaluator state: it is read and written only here, one cycle at
/// a time. Each cycle fetches a window, evaluates, applies the exit policy
/// and, on a signal, sizes and submits one market order.
pub struct Engine {
    symbol: String,
    timeframe: Timeframe,
    sleep_interval: Duration,
    close_open_on_signal: bool,
    evaluator: Evaluator,
    exit: Option<ExitPolicy>,
    sizer: OrderSizer,
    broker: Arc<dyn BrokerClient>,
    executor: OrderExecutor,
    state: EvaluatorState,
}

impl Engine {
    pub fn new(cfg: &BotConfig, broker: Arc<dyn BrokerClient>) -> Self {
        let sizer = OrderSizer::new(SizingConfig {
            lot_size: cfg.lot_size,
            stop_loss_pips: cfg.stop_loss_pips,
            take_profit_pips: cfg.take_profit_pips,
            price_multiplier: cfg.price_multiplier,
            attach_stops: cfg.attach_stops,
            magic: cfg.magic,
            comment: cfg.comment.clone(),
        });
        Self {
            symbol: cfg.symbol.clone(),
            timeframe: cfg.timeframe,
            sleep_interval: Duration::from_secs(cfg.sleep_interval_seconds),
            close_open_on_signal: cfg.close_open_on_signal,
            evaluator: Evaluator::from_config(cfg),
            exit: ExitPolicy::from_config(cfg),
            sizer,
            executor: OrderExecutor::new(broker.clone()),
            broker,
            state: EvaluatorState::Unprimed,
        }
    }

    pub fn state(&self) -> &EvaluatorState {
        &self.state
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Bars requested per cycle: enough for the entry strategy and the exit rule.
    pub fn fetch_size(&self) -> usize {
        window_size(&self.evaluator, self.exit.as_ref())
    }

    /// `fetch_size` of the engine `cfg` would build.
    pub fn fetch_size_for(cfg: &BotConfig) -> usize {
        window_size(&Evaluator::from_config(cfg), ExitPolicy::from_config(cfg).as_ref())
    }

    /// Run one fetch → evaluate → exit → enter cycle.
    ///
    /// Unavailable data yields `Signal::None` with the state preserved.
    /// Unexpected errors propagate and leave the state at its pre-cycle value.
    /// The rollback covers the evaluator state only: positions closed earlier
    /// in the failing cycle stay closed.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let count = self.fetch_size();
        let window = match self.broker.fetch_bars(&self.symbol, self.timeframe, count).await {
            Ok(w) => w,
            Err(e) if e.is_recoverable() => {
                warn!(symbol = %self.symbol, error = %e, "Bar fetch failed, skipping cycle");
                return Ok(CycleReport::idle());
            }
            Err(e) => return Err(e),
        };
        if window.is_empty() {
            warn!(symbol = %self.symbol, timeframe = %self.timeframe, "No bars available, skipping cycle");
            return Ok(CycleReport::idle());
        }

        let snapshot = self.evaluator.snapshot(&window);
        debug!(symbol = %self.symbol, bars = window.len(), ?snapshot, "Indicators computed");

        let prior = self.state;
        let (next, signal) = self.evaluator.evaluate_snapshot(&snapshot, &prior)?;
        self.state = next;

        let (closed, order) = match self.act(&snapshot, &prior, signal).await {
            Ok(done) => done,
            Err(e) => {
                self.state = prior;
                return Err(e);
            }
        };

        Ok(CycleReport {
            signal,
            bars: window.len(),
            closed,
            order,
        })
    }

    /// Close open positions the exit policy selects for this window.
    /// `prior_state` is the evaluator state from before this cycle's update.
    pub async fn apply_exit_policy(&self, window: &[Bar], prior_state: &EvaluatorState) -> Result<Vec<u64>> {
        let snapshot = self.evaluator.snapshot(window);
        self.exit_with_snapshot(&snapshot, prior_state).await
    }

    /// Poll until `shutdown` resolves, sleeping `sleep_interval_seconds`
    /// between cycles. Returns the first unexpected error.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            symbol = %self.symbol,
            strategy = %self.evaluator.kind(),
            timeframe = %self.timeframe,
            interval_secs = self.sleep_interval.as_secs(),
            bars = self.fetch_size(),
            "Engine running"
        );

        loop {
            let report = self.run_cycle().await?;
            if report.signal.is_none() {
                debug!(symbol = %self.symbol, bars = report.bars, "Cycle complete, no signal");
            } else {
                info!(
                    symbol = %self.symbol,
                    signal = %report.signal,
                    ticket = ?report.order.as_ref().map(|r| r.ticket),
                    "Cycle complete"
                );
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!(symbol = %self.symbol, "Shutdown signal received, stopping engine");
                    break;
                }
                _ = tokio::time::sleep(self.sleep_interval) => {}
            }
        }
        Ok(())
    }

    async fn act(
        &self,
        snapshot: &IndicatorSnapshot,
        prior: &EvaluatorState,
        signal: Signal,
    ) -> Result<(Vec<u64>, Option<OrderReceipt>)> {
        let mut closed = self.exit_with_snapshot(snapshot, prior).await?;
        let Some(side) = signal.side() else {
            return Ok((closed, None));
        };
        if self.close_open_on_signal {
            closed.extend(self.close_open_positions().await?);
        }
        let order = self.enter(side).await?;
        Ok((closed, order))
    }

    async fn exit_with_snapshot(
        &self,
        snapshot: &IndicatorSnapshot,
        prior_state: &EvaluatorState,
    ) -> Result<Vec<u64>> {
        let Some(policy) = &self.exit else {
            return Ok(Vec::new());
        };
        let Some(positions) = recoverable(self.broker.open_positions(&self.symbol).await, "open positions")? else {
            return Ok(Vec::new());
        };
        let tickets = policy.select(&positions, &self.symbol, snapshot, prior_state.rsi());
        if tickets.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.executor.close_all(&self.symbol, &tickets).await)
    }

    async fn close_open_positions(&self) -> Result<Vec<u64>> {
        let Some(positions) = recoverable(self.broker.open_positions(&self.symbol).await, "open positions")? else {
            return Ok(Vec::new());
        };
        let tickets: Vec<u64> = positions.iter().map(|p| p.ticket).collect();
        if tickets.is_empty() {
            return Ok(tickets);
        }
        info!(symbol = %self.symbol, ?tickets, "Closing open positions before new entry");
        Ok(self.executor.close_all(&self.symbol, &tickets).await)
    }

    async fn enter(&self, side: OrderSide) -> Result<Option<OrderReceipt>> {
        let Some(tick) = recoverable(self.broker.current_tick(&self.symbol).await, "tick")? else {
            return Ok(None);
        };
        let Some(meta) = recoverable(self.broker.instrument_meta(&self.symbol).await, "instrument meta")? else {
            return Ok(None);
        };

        let order = match self.sizer.build(&self.symbol, side, &tick, &meta) {
            Ok(order) => order,
            Err(reason) => {
                warn!(symbol = %self.symbol, side = %side, %reason, "Order rejected before submission");
                return Ok(None);
            }
        };
        Ok(self.executor.submit(&order).await)
    }
}

fn window_size(evaluator: &Evaluator, exit: Option<&ExitPolicy>) -> usize {
    let params = evaluator.params();
    let exit_bars = match exit.map(ExitPolicy::rule) {
        Some(ExitRule::Aroon { .. }) => params.aroon_window,
        Some(ExitRule::Rsi) => params.rsi_period + 1,
        None => 0,
    };
    evaluator.required_bars().max(exit_bars)
}

/// Downgrade a recoverable broker error to `None` (logged), propagate the rest.
fn recoverable<T>(res: Result<T>, what: &str) -> Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, "Broker call for {what} failed, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
